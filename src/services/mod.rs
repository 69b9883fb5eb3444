pub mod api_client;
pub mod preprocessor;
pub mod recommendation;
pub mod serving;
