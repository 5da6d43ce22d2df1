pub mod client;
pub mod http_api;

#[cfg(test)]
pub mod fake;
