#[tokio::main]
async fn main() -> Result<(), activity_booking::error::AppError> {
    activity_booking::run().await
}
