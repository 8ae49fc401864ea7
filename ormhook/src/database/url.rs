use crate::errors::{ErrorKind, OrmError, OrmResult};
use indexmap::IndexMap;
use regex::Regex;
use secure_string::SecureString;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?:(?P<user>[^:@/?]+)(?::(?P<password>[^@/?]*))?@)?(?P<host>[^:/?]*)(?::(?P<port>\d+))?(?:/(?P<name>[^?]*))?(?:\?(?P<params>.*))?$",
    )
    .expect("database url pattern is valid")
});

/// A parsed `scheme://[user[:password]@]host[:port][/name][?key=value&...]` connection URL.
///
/// The password is kept in a [`SecureString`] and never shown by `Display` or `Debug`.
#[derive(Clone)]
pub struct DatabaseUrl {
    scheme: String,
    user: Option<String>,
    password: Option<SecureString>,
    host: String,
    port: Option<u16>,
    name: Option<String>,
    params: IndexMap<String, String>,
}

impl DatabaseUrl {
    pub fn parse(url: &str) -> OrmResult<Self> {
        let captures = URL_PATTERN.captures(url.trim()).ok_or_else(|| {
            log::error!("Malformed database url");
            OrmError::new(
                "Malformed database url, expected scheme://[user[:password]@]host[:port][/name]",
                ErrorKind::InvalidConfiguration,
            )
        })?;

        let text = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
        };

        let port = match text("port") {
            Some(port) => Some(port.parse::<u16>()?),
            None => None,
        };

        let mut params = IndexMap::new();
        if let Some(query) = text("params") {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                if key.is_empty() {
                    log::error!("Database url has a parameter without a name");
                    return Err(OrmError::new(
                        "Database url has a parameter without a name",
                        ErrorKind::InvalidConfiguration,
                    ));
                }
                params.insert(key.to_string(), value.to_string());
            }
        }

        Ok(DatabaseUrl {
            scheme: captures["scheme"].to_ascii_lowercase(),
            user: text("user").map(str::to_string),
            password: text("password").map(SecureString::from),
            host: text("host").unwrap_or_default().to_string(),
            port,
            name: text("name").map(str::to_string),
            params,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.unsecure())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Database name from the path, falling back to the host (`memory://blog` names `blog`).
    pub fn database_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.host)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for DatabaseUrl {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatabaseUrl::parse(s)
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}", user)?;
            if self.password.is_some() {
                write!(f, ":***")?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(name) = &self.name {
            write!(f, "/{}", name)?;
        }
        for (i, (key, value)) in self.params.iter().enumerate() {
            let separator = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", separator, key, value)?;
        }
        Ok(())
    }
}

impl Debug for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DatabaseUrl({})", self)
    }
}
