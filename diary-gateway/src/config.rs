use std::env;

#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub notes_service_url: String,
    pub internal_api_secret: String,
    pub identity_verify_url: String,
    pub web_app_url: String,
    pub port: u16,
    pub database_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .expect("TELEGRAM_BOT_TOKEN must be set"),
            notes_service_url: env::var("NOTES_SERVICE_URL")
                .expect("NOTES_SERVICE_URL must be set"),
            internal_api_secret: env::var("INTERNAL_API_SECRET")
                .expect("INTERNAL_API_SECRET must be set"),
            identity_verify_url: env::var("IDENTITY_VERIFY_URL")
                .expect("IDENTITY_VERIFY_URL must be set"),
            web_app_url: env::var("WEB_APP_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./diary_gateway.db".to_string()),
        }
    }
}
