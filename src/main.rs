//! Portfolio CMS Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    portfolio_cms_backend::run().await;
}
