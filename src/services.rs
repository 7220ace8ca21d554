pub mod aggregation;
pub mod chat_service;
pub mod dashboard_service;
pub mod responder;
