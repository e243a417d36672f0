use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::config::non_empty;
use crate::error::ApiError;

const INSTAGRAM_COOKIE_DOMAIN: &str = ".instagram.com";

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub sessionid: Option<String>,
    pub csrftoken: Option<String>,
    pub ds_user_id: Option<String>,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        [&self.sessionid, &self.csrftoken, &self.ds_user_id]
            .iter()
            .all(|value| value.as_deref().and_then(non_empty).is_some())
    }
}

#[derive(Debug)]
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    pub async fn create(
        sessionid: &str,
        csrftoken: &str,
        ds_user_id: &str,
    ) -> Result<Self, ApiError> {
        let path = std::env::temp_dir().join(format!("cookies-{}.txt", Uuid::new_v4()));
        let contents = render_cookie_file(&[
            ("sessionid", sessionid),
            ("csrftoken", csrftoken),
            ("ds_user_id", ds_user_id),
        ]);

        tokio::fs::write(&path, contents).await.map_err(|error| {
            ApiError::internal(format!("No se pudo crear el archivo de cookies: {error}"))
        })?;

        Ok(Self { path })
    }

    pub async fn from_credentials(credentials: &Credentials) -> Result<Self, ApiError> {
        Self::create(
            credentials.sessionid.as_deref().unwrap_or_default(),
            credentials.csrftoken.as_deref().unwrap_or_default(),
            credentials.ds_user_id.as_deref().unwrap_or_default(),
        )
        .await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(self) {
        if let Err(error) = tokio::fs::remove_file(&self.path).await
            && error.kind() != ErrorKind::NotFound
        {
            info!("No se pudo borrar el archivo de cookies: {error}");
        }
    }
}

fn render_cookie_file(cookies: &[(&str, &str)]) -> String {
    let mut contents = String::from(
        "# Netscape HTTP Cookie File\n# This is a generated file! Do not edit.\n\n",
    );

    for (name, value) in cookies {
        if let Some(value) = non_empty(value) {
            contents.push_str(&format!(
                "{INSTAGRAM_COOKIE_DOMAIN}\tTRUE\t/\tTRUE\t0\t{name}\t{value}\n"
            ));
        }
    }

    contents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_netscape_lines_and_skips_blanks() {
        let contents = render_cookie_file(&[("sessionid", " abc "), ("csrftoken", "  ")]);

        assert!(contents.starts_with("# Netscape HTTP Cookie File\n"));
        assert!(contents.contains(".instagram.com\tTRUE\t/\tTRUE\t0\tsessionid\tabc\n"));
        assert!(!contents.contains("csrftoken"));
    }

    #[test]
    fn credentials_need_all_three_values() {
        let mut credentials = Credentials {
            sessionid: Some("s".into()),
            csrftoken: Some("c".into()),
            ds_user_id: None,
        };
        assert!(!credentials.is_complete());

        credentials.ds_user_id = Some("  ".into());
        assert!(!credentials.is_complete());

        credentials.ds_user_id = Some("42".into());
        assert!(credentials.is_complete());
    }

    #[tokio::test]
    async fn file_is_written_and_removed() {
        let file = CookieFile::create("s", "c", "42").await.unwrap();
        let path = file.path().to_path_buf();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("ds_user_id\t42"));

        file.remove().await;
        assert!(!path.exists());
    }
}
