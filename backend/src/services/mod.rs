pub mod audit;
pub mod chat;
pub mod encryption;
pub mod export;
pub mod notifier;
pub mod stats;
pub mod tickets;

pub use chat::ChatService;
pub use notifier::Notifier;
pub use tickets::TicketService;
