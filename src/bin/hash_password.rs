use woodmart_api::services::auth_service::hash_password;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: hash_password <password>"))?;

    let hash = hash_password(&password)?;
    println!("ADMIN_PASSWORD_HASH={hash}");
    Ok(())
}
