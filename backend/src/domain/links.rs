//! Client-facing links embedded in notification emails.

use url::Url;

use super::Error;

/// Builds verification and password-reset links under the application URL.
///
/// # Examples
/// ```
/// use research_backend::domain::AppLinks;
///
/// let links = AppLinks::new("https://research.example.com/app").expect("valid url");
/// assert_eq!(
///     links.verification("abc.def.ghi"),
///     "https://research.example.com/app/auth/verification/abc.def.ghi"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLinks {
    base: Url,
}

impl AppLinks {
    /// Parse the application URL. A trailing slash is implied.
    pub fn new(app_url: &str) -> Result<Self, Error> {
        let mut base = Url::parse(app_url.trim())
            .map_err(|err| Error::invalid_request(format!("invalid application URL: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::invalid_request(
                "application URL cannot carry path segments",
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// Email verification link for `token`.
    pub fn verification(&self, token: &str) -> String {
        self.under("auth/verification", token)
    }

    /// Password reset link for `token`.
    pub fn password_reset(&self, token: &str) -> String {
        self.under("auth/password", token)
    }

    fn under(&self, prefix: &str, token: &str) -> String {
        let mut link = self.base.clone();
        if let Ok(mut segments) = link.path_segments_mut() {
            segments.pop_if_empty().extend(prefix.split('/')).push(token);
        }
        link.to_string()
    }
}
