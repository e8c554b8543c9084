#[actix_web::main]
async fn main() {
    if let Err(e) = tabclean_lib::run().await {
        eprintln!("tabclean: {}", e);
        std::process::exit(1);
    }
}
