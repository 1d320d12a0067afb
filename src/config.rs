use std::env;

#[derive(Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            mongo_uri: env::var("MONGO_URI").expect("MONGO_URI must be set"),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "task_db".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults() {
        env::set_var("MONGO_URI", "mongodb://localhost:27017");
        env::remove_var("DATABASE_NAME");
        env::remove_var("BIND_ADDR");

        let config = Config::from_env();
        assert_eq!(config.database_name, "task_db");
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}
