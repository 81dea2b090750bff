pub mod audit_logs;
pub mod contact_messages;
pub mod orders;

pub use audit_logs::Entity as AuditLogs;
pub use contact_messages::Entity as ContactMessages;
pub use orders::Entity as Orders;
