pub use crate::utils::database;
use crate::modules::order::events::OrderEvents;
use async_trait::async_trait;
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use std::env;

#[derive(Clone)]
pub enum AppEnvironment {
    Production,
    Development,
}

impl AppEnvironment {
    pub fn from(raw_environment: String) -> Self {
        match raw_environment.as_ref() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
    pub url: String,
}

#[derive(Clone)]
pub struct AuthContext {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct MailContext {
    pub transport: AsyncSmtpTransport<Tokio1Executor>,
    pub sender_name: String,
    pub sender_email: String,
}

#[derive(Clone)]
pub struct Context {
    pub app: AppContext,
    pub db_conn: database::DatabaseConnection,
    pub auth: AuthContext,
    pub mail: MailContext,
    pub order_events: OrderEvents,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
    pub url: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct MailConfig {
    pub uri: String,
    pub sender_name: String,
    pub sender_email: String,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Context;
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Context {
        let db_conn = database::connect(self.database.url.as_str(), self.database.pool_size).await;
        database::migrate(&db_conn).await;

        let mail_transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(&self.mail.uri)
            .expect("Invalid mail uri")
            .build();

        Context {
            app: AppContext {
                host: self.app.host,
                environment: self.app.environment,
                port: self.app.port,
                url: self.app.url,
            },
            db_conn,
            auth: AuthContext {
                jwt_secret: self.auth.jwt_secret,
            },
            mail: MailContext {
                transport: mail_transport,
                sender_name: self.mail.sender_name,
                sender_email: self.mail.sender_email,
            },
            order_events: OrderEvents::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let database_pool_size = env::var("DATABASE_POOL_SIZE")
            .unwrap_or_else(|_| "8".to_string())
            .parse::<u32>()
            .expect("Invalid DATABASE_POOL_SIZE number");
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let environment = env::var("APP_ENV").expect("APP_ENV not set");
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u32>()
            .expect("Invalid PORT number");
        let url = env::var("URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET not set");
        let mail_uri = env::var("MAIL_URI").expect("MAIL_URI not set");
        let mail_sender_name = env::var("MAIL_SENDER_NAME").expect("MAIL_SENDER_NAME not set");
        let mail_sender_email = env::var("MAIL_SENDER_EMAIL").expect("MAIL_SENDER_EMAIL not set");

        Self {
            database: DatabaseConfig {
                url: database_url,
                pool_size: database_pool_size,
            },
            app: AppConfig {
                host,
                environment: AppEnvironment::from(environment),
                port,
                url,
            },
            auth: AuthConfig { jwt_secret },
            mail: MailConfig {
                uri: mail_uri,
                sender_name: mail_sender_name,
                sender_email: mail_sender_email,
            },
        }
    }
}
