//! Checks a remote document for the keywords instead of sweeping addresses.
//!
//! Useful to confirm keywords against an organisation's own pages before
//! spending hours on a sweep.
use log::debug;

use crate::error::{Result, ScanError};
use crate::keywords::Keywords;

/// Downloads `url` and returns its body as text.
pub async fn fetch_document(url: &str) -> Result<String> {
    let fetch_err = |source: reqwest::Error| ScanError::Fetch {
        url: url.to_owned(),
        source,
    };

    let response = reqwest::get(url).await.map_err(fetch_err)?;
    debug!("GET {url} -> {}", response.status());
    response.text().await.map_err(fetch_err)
}

/// Keywords contained in `body`, in keyword order.
#[must_use]
pub fn keywords_in<'k>(body: &str, keywords: &'k Keywords) -> Vec<&'k str> {
    keywords.iter().filter(|word| body.contains(word)).collect()
}

/// The report lines printed for a document scan.
#[must_use]
pub fn report(url: &str, found: &[&str]) -> Vec<String> {
    if found.is_empty() {
        return vec![format!("No keywords found in {url}")];
    }
    found
        .iter()
        .map(|word| format!("Keyword '{word}' found in {url}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{fetch_document, keywords_in, report};
    use crate::error::ScanError;
    use crate::keywords::Keywords;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn finds_contained_keywords_only() {
        let keywords: Keywords = "azure,office,aws".parse().unwrap();
        let body = "<html>Sign in to Office 365 with Azure AD: office.com, azure.com</html>";

        assert_eq!(keywords_in(body, &keywords), ["azure", "office"]);
    }

    #[test]
    fn report_lines() {
        let url = "https://example.com/";
        assert_eq!(
            report(url, &["azure", "office"]),
            [
                "Keyword 'azure' found in https://example.com/",
                "Keyword 'office' found in https://example.com/"
            ]
        );
        assert_eq!(report(url, &[]), ["No keywords found in https://example.com/"]);
    }

    #[tokio::test]
    async fn fetches_body_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await.unwrap();
            let body = "mail relay: smtp.corp.example";
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });

        let body = fetch_document(&format!("http://{addr}/")).await.unwrap();
        assert_eq!(body, "mail relay: smtp.corp.example");
    }

    #[tokio::test]
    async fn malformed_url_is_a_fetch_error() {
        assert!(matches!(
            fetch_document("not a url").await,
            Err(ScanError::Fetch { .. })
        ));
    }
}
