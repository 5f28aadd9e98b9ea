pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        session_ttl_seconds: i64,
        secure_cookies: bool,
    },
}
