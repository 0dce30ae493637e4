#[tokio::main]
async fn main() {
    lms_survey::start_server().await;
}
