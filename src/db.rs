pub mod ticket_repo;
pub use ticket_repo::{MockTicketSource, PgTicketRepository, TicketSource};
pub mod ai_config_repo;
pub use ai_config_repo::AiConfigRepository;
