use rust_decimal::Decimal;
use serde_json::json;
use woodmart_api::{
    amounts::{PriorAmounts, compute_amounts, round_cents, stored_amounts},
    models::{Amounts, LineItem, Shipping},
};

fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

fn item(price: &str, quantity: i64) -> LineItem {
    LineItem {
        product_ref: "sku".into(),
        title: "Item".into(),
        slug: "item".into(),
        image_ref: None,
        unit_price: dec(price),
        quantity,
    }
}

fn shipping(fee: Option<&str>) -> Shipping {
    Shipping {
        method: "courier".into(),
        fee: fee.map(dec),
    }
}

#[test]
fn two_items_plus_fee() {
    let amounts = compute_amounts(&[item("10", 2)], &shipping(Some("5")), None);
    assert_eq!(
        amounts,
        Amounts {
            subtotal: dec("20"),
            shipping: dec("5"),
            total: dec("25"),
        }
    );
}

#[test]
fn empty_items_cost_only_shipping() {
    let amounts = compute_amounts(&[], &shipping(Some("4.99")), None);
    assert_eq!(amounts.subtotal, Decimal::ZERO);
    assert_eq!(amounts.total, dec("4.99"));
}

#[test]
fn missing_fee_falls_back_to_prior_shipping() {
    let prior = PriorAmounts {
        shipping: Some(dec("7.5")),
        ..Default::default()
    };
    let amounts = compute_amounts(&[item("3", 1)], &shipping(None), Some(&prior));
    assert_eq!(amounts.shipping, dec("7.50"));
    assert_eq!(amounts.total, dec("10.50"));

    let none = compute_amounts(&[item("3", 1)], &shipping(None), None);
    assert_eq!(none.shipping, Decimal::ZERO);
    assert_eq!(none.total, dec("3"));
}

#[test]
fn explicit_fee_wins_over_prior() {
    let prior = PriorAmounts {
        shipping: Some(dec("99")),
        ..Default::default()
    };
    let amounts = compute_amounts(&[item("1", 1)], &shipping(Some("2")), Some(&prior));
    assert_eq!(amounts.shipping, dec("2"));
}

#[test]
fn rounds_half_away_from_zero() {
    assert_eq!(round_cents(dec("1.005")), dec("1.01"));
    assert_eq!(round_cents(dec("0.125")), dec("0.13"));
    assert_eq!(round_cents(dec("2.344")), dec("2.34"));

    let amounts = compute_amounts(&[item("0.335", 3)], &shipping(Some("0.005")), None);
    // 1.005 -> 1.01, 0.005 -> 0.01
    assert_eq!(amounts.subtotal, dec("1.01"));
    assert_eq!(amounts.shipping, dec("0.01"));
    assert_eq!(amounts.total, dec("1.02"));
}

#[test]
fn total_is_sum_of_rounded_parts() {
    let cases = [
        (vec![item("19.999", 1), item("0.333", 3)], Some("1.555")),
        (vec![item("0.1", 3)], Some("0.2")),
        (vec![item("1234.565", 7), item("0.004", 1)], None),
        (vec![item("5", 0)], Some("0")),
    ];

    for (items, fee) in cases {
        let first = compute_amounts(&items, &shipping(fee), None);
        let second = compute_amounts(&items, &shipping(fee), None);
        assert_eq!(first, second);
        assert_eq!(first.total, round_cents(first.subtotal + first.shipping));
        assert_eq!(first.subtotal, round_cents(first.subtotal));
    }
}

#[test]
fn overflowing_line_contributes_zero() {
    let items = [item("1", 1), LineItem {
        unit_price: Decimal::MAX,
        quantity: 2,
        ..item("0", 0)
    }];
    let amounts = compute_amounts(&items, &shipping(None), None);
    assert_eq!(amounts.subtotal, dec("1"));
}

#[test]
fn stored_amounts_require_three_numbers() {
    let ok = json!({ "subtotal": 20, "shipping": 5.5, "total": 25.5 });
    assert_eq!(
        stored_amounts(Some(&ok)),
        Some(Amounts {
            subtotal: dec("20"),
            shipping: dec("5.5"),
            total: dec("25.5"),
        })
    );

    assert_eq!(stored_amounts(None), None);
    assert_eq!(stored_amounts(Some(&json!({ "subtotal": 20, "shipping": 5 }))), None);
    assert_eq!(
        stored_amounts(Some(&json!({ "subtotal": "20", "shipping": 5, "total": 25 }))),
        None
    );
    assert_eq!(stored_amounts(Some(&json!("garbage"))), None);
}

#[test]
fn prior_amounts_read_numeric_strings() {
    let prior = PriorAmounts::from_json(&json!({ "shipping": "4.20", "total": null }));
    assert_eq!(prior.shipping, Some(dec("4.20")));
    assert_eq!(prior.total, None);
    assert_eq!(prior.subtotal, None);
}

#[test]
fn legacy_line_items_decode_leniently() {
    let items: Vec<LineItem> = serde_json::from_value(json!([
        { "productId": "a", "price": "12.50", "qty": "2" },
        { "productId": "b", "price": "abc", "qty": 1.5 },
        { "productId": "c" }
    ]))
    .expect("lenient decode");

    assert_eq!(items[0].unit_price, dec("12.50"));
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[1].unit_price, Decimal::ZERO);
    assert_eq!(items[1].quantity, 0);
    assert_eq!(items[2].quantity, 0);

    let amounts = compute_amounts(&items, &Shipping::default(), None);
    assert_eq!(amounts.total, dec("25"));
}

#[test]
fn mistyped_text_fields_are_coerced() {
    let items: Vec<LineItem> = serde_json::from_value(json!([
        { "productId": 42, "title": 123, "slug": true, "image": 7, "price": 15, "qty": 2 },
        { "title": { "en": "Chair" }, "image": null, "price": 1, "qty": 1 }
    ]))
    .expect("lenient decode");

    assert_eq!(items[0].product_ref, "42");
    assert_eq!(items[0].title, "123");
    assert_eq!(items[0].slug, "true");
    assert_eq!(items[0].image_ref.as_deref(), Some("7"));
    assert_eq!(items[1].title, "");
    assert_eq!(items[1].image_ref, None);

    let shipping: Shipping =
        serde_json::from_value(json!({ "method": 3, "fee": 5 })).expect("decode");
    assert_eq!(shipping.method, "3");
    let amounts = compute_amounts(&items, &shipping, None);
    assert_eq!(amounts.total, dec("36"));
}

#[test]
fn non_numeric_stored_fee_counts_as_absent() {
    let shipping: Shipping =
        serde_json::from_value(json!({ "method": "pickup", "fee": "free" })).expect("decode");
    assert_eq!(shipping.fee, None);
}
