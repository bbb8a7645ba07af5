use std::{net::SocketAddr, path::PathBuf};

use color_eyre::eyre::WrapErr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> color_eyre::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").wrap_err("DATABASE_URL must be set")?;

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .map(|x| x.parse())
            .transpose()
            .wrap_err("DATABASE_MAX_CONNECTIONS must be a number")?
            .unwrap_or(5);

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| String::from("127.0.0.1:5000"))
            .parse()
            .wrap_err("BIND_ADDR must be a socket address")?;

        let jwt_secret =
            std::env::var("JWT_SECRET").wrap_err("JWT_SECRET must be set")?;

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            jwt_secret,
            upload_dir,
        })
    }
}
