use serde::Serialize;

/// HTTP error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpErrorCategory {
    Client,    // 4xx errors
    Server,    // 5xx errors
    Auth,      // 401, 403
    RateLimit, // 429
}

/// Enriched HTTP error information
#[derive(Debug, Clone, Serialize)]
pub struct HttpErrorInfo {
    pub status_code: Option<u16>,
    pub category: HttpErrorCategory,
    pub description: String,
    pub suggestion: String,
}

impl HttpErrorInfo {
    /// Create from HTTP status code
    pub fn from_status(status: u16) -> Self {
        let (category, description, suggestion) = match status {
            401 => (
                HttpErrorCategory::Auth,
                "Unauthorized".to_string(),
                "The official servers need a logged-in session cookie.",
            ),
            403 => (
                HttpErrorCategory::Auth,
                "Forbidden".to_string(),
                "Access denied. Check the session cookie or try the mirror.",
            ),
            404 => (
                HttpErrorCategory::Client,
                "Not Found".to_string(),
                "This backend does not carry the beatmap set.",
            ),
            451 => (
                HttpErrorCategory::Client,
                "Unavailable For Legal Reasons".to_string(),
                "The set was taken down. A mirror may still have a copy.",
            ),
            429 => (
                HttpErrorCategory::RateLimit,
                "Too Many Requests".to_string(),
                "Rate limited. Wait a moment before downloading again.",
            ),
            500 | 502 | 503 | 504 => (
                HttpErrorCategory::Server,
                match status {
                    500 => "Internal Server Error".to_string(),
                    502 => "Bad Gateway".to_string(),
                    503 => "Service Unavailable".to_string(),
                    _ => "Gateway Timeout".to_string(),
                },
                "Server-side issue. Retrying later may succeed.",
            ),
            _ if (400..500).contains(&status) => (
                HttpErrorCategory::Client,
                format!("Client Error ({})", status),
                "Check the backend URL in the settings.",
            ),
            _ if status >= 500 => (
                HttpErrorCategory::Server,
                format!("Server Error ({})", status),
                "Server-side issue. Retrying later may succeed.",
            ),
            _ => (
                HttpErrorCategory::Client,
                format!("HTTP Error ({})", status),
                "Unexpected response. Check logs for details.",
            ),
        };

        Self {
            status_code: Some(status),
            category,
            description,
            suggestion: suggestion.to_string(),
        }
    }

    /// Whether trying again later can help
    pub fn is_retryable(&self) -> bool {
        matches!(self.category, HttpErrorCategory::Server | HttpErrorCategory::RateLimit)
    }

    /// Format for display
    pub fn format(&self) -> String {
        if let Some(code) = self.status_code {
            format!("HTTP {} - {}", code, self.description)
        } else {
            self.description.clone()
        }
    }

    /// Status line plus the suggestion
    pub fn detail(&self) -> String {
        format!("{} ({})", self.format(), self.suggestion)
    }
}
