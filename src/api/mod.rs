pub mod ai_api;
