use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

/// Teams listed first on the employee list page, in this order.
pub const DEFAULT_TEAM_ORDER: [&str; 4] = ["테스트팀", "경영지원팀", "플랫폼솔루션개발팀", "센터"];

/// Development accounts; replace through `INSA_USERS` in production.
pub const DEFAULT_USERS: &str = "admin:1234,assesta:0820";

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the `db/`, `resume/` and `photo/` directories.
    pub private_dir: PathBuf,
    pub db_filename: String,
    /// Peer addresses allowed in. Empty disables the check.
    pub ip_whitelist: HashSet<String>,
    pub session_minutes: u64,
    pub session_cookie_secure: bool,
    /// Reload templates from disk on every render.
    pub debug: bool,
    pub template_dir: PathBuf,
    pub static_dir: PathBuf,
    pub team_order: Vec<String>,
    pub host: String,
    pub port: u16,
    /// `(username, password)` pairs accepted by the login form.
    pub users: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            private_dir: PathBuf::from("private"),
            db_filename: "insa_DB.xlsx".to_string(),
            ip_whitelist: HashSet::new(),
            session_minutes: 40,
            session_cookie_secure: false,
            debug: false,
            template_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            team_order: DEFAULT_TEAM_ORDER.iter().map(|t| t.to_string()).collect(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            users: parse_users(DEFAULT_USERS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            private_dir: env::var("INSA_PRIVATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.private_dir),
            db_filename: env::var("DB_FILENAME").unwrap_or(defaults.db_filename),
            ip_whitelist: env::var("IP_WHITELIST")
                .map(|raw| split_list(&raw).collect())
                .unwrap_or_default(),
            session_minutes: env::var("SESSION_MINUTES")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.session_minutes),
            session_cookie_secure: flag("SESSION_COOKIE_SECURE"),
            debug: flag("INSA_DEBUG"),
            template_dir: env::var("INSA_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_dir),
            static_dir: env::var("INSA_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            team_order: env::var("TEAM_ORDER")
                .map(|raw| split_list(&raw).collect())
                .unwrap_or(defaults.team_order),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            users: env::var("INSA_USERS")
                .map(|raw| parse_users(&raw))
                .unwrap_or(defaults.users),
        }
    }

    /// Directory holding the backing file and the change log.
    pub fn db_dir(&self) -> PathBuf {
        self.private_dir.join("db")
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir().join(&self.db_filename)
    }

    pub fn change_log_path(&self) -> PathBuf {
        self.db_dir().join("change_log.jsonl")
    }

    pub fn resume_dir(&self) -> PathBuf {
        self.private_dir.join("resume")
    }

    pub fn photo_dir(&self) -> PathBuf {
        self.private_dir.join("photo")
    }

    /// Create the private directories if they are missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.db_dir(), self.resume_dir(), self.photo_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn flag(name: &str) -> bool {
    env::var(name).map(|v| v.trim() == "1").unwrap_or(false)
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

/// Parse `user:password,user2:password2`. Entries without a colon are ignored.
pub fn parse_users(raw: &str) -> Vec<(String, String)> {
    split_list(raw)
        .filter_map(|entry| {
            let (user, password) = entry.split_once(':')?;
            let user = user.trim();
            (!user.is_empty()).then(|| (user.to_string(), password.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_parse() {
        let users = parse_users("admin:1234, bob:pw:with:colons ,broken");
        assert_eq!(
            users,
            vec![
                ("admin".to_string(), "1234".to_string()),
                ("bob".to_string(), "pw:with:colons".to_string()),
            ]
        );
    }

    #[test]
    fn paths_hang_off_private_dir() {
        let config = Config::default();
        assert_eq!(
            config.db_path(),
            PathBuf::from("private").join("db").join("insa_DB.xlsx")
        );
        assert_eq!(
            config.change_log_path(),
            PathBuf::from("private/db/change_log.jsonl")
        );
    }
}
