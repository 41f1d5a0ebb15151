use axum::response::Html;

// axum handler for the landing page
pub async fn root() -> Html<&'static str> {
    Html(concat!(
        "<h1>",
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION"),
        "</h1>"
    ))
}
