use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

/// Форматирует размер с разделителями тысяч (точками): 1234567 -> "1.234.567"
fn format_size(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Middleware для логирования HTTP запросов
///
/// Пишет в tracing: метод, путь, статус, размер ответа (по Content-Length,
/// тело не буферизуется) и длительность.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let size = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .map(format_size)
        .unwrap_or_else(|| "-".to_string());
    let status = response.status().as_u16();
    let duration = start.elapsed();

    if response.status().is_server_error() {
        tracing::error!(
            "{} | {:>5}ms | {:>12} | {} {:>6} {}",
            Utc::now().format("%H:%M:%S"),
            duration.as_millis(),
            size,
            status,
            method,
            path
        );
    } else {
        tracing::info!(
            "{} | {:>5}ms | {:>12} | {} {:>6} {}",
            Utc::now().format("%H:%M:%S"),
            duration.as_millis(),
            size,
            status,
            method,
            path
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0");
        assert_eq!(format_size(999), "999");
        assert_eq!(format_size(1000), "1.000");
        assert_eq!(format_size(1234567), "1.234.567");
    }
}
