#![forbid(unsafe_code)]

use std::fs;

use anyhow::{Result, anyhow};
use log::info;
use tera::{Context, Tera};

use crate::utils::errors::Errors;
use crate::utils::hello_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SCRIPT_TEMPLATE_NAME: &str = "init-db.js";
const SCRIPT_TEMPLATE     : &str = include_str!("../templates/init-db.js");

const DEFAULT_DATABASE    : &str = "cookbook";
const DEFAULT_USER        : &str = "cookbook-user";
const DEFAULT_PASSWORD    : &str = "cookbookuserpass";
const DEFAULT_ROLE        : &str = "readWrite";

// ***************************************************************************
//                              DbProvisioning
// ***************************************************************************
/// The one database user the deployment creates.  Nothing in the
/// application connects with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbProvisioning {
    pub database: String,
    pub user: String,
    pub password: String,
    pub role: String,
}

impl Default for DbProvisioning {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            role: DEFAULT_ROLE.to_string(),
        }
    }
}

impl DbProvisioning {
    /// Command line values replace the defaults they are given for.
    pub fn from_args(database: Option<String>, user: Option<String>, password: Option<String>) -> Self {
        let d = Self::default();
        Self {
            database: database.unwrap_or(d.database),
            user: user.unwrap_or(d.user),
            password: password.unwrap_or(d.password),
            role: d.role,
        }
    }

    /// Render the mongo shell script.  Every value is emitted as a JSON
    /// string literal so it can't break out of the script.
    pub fn render_script(&self) -> Result<String> {
        let mut ctx = Context::new();
        ctx.insert("database", &serde_json::to_string(&self.database)?);
        ctx.insert("user", &serde_json::to_string(&self.user)?);
        ctx.insert("password", &serde_json::to_string(&self.password)?);
        ctx.insert("role", &serde_json::to_string(&self.role)?);
        ctx.insert("database_line", &serde_json::to_string(&format!("Database: {}", self.database))?);
        ctx.insert("user_line", &serde_json::to_string(&format!("User: {}", self.user))?);

        Tera::one_off(SCRIPT_TEMPLATE, &ctx, false)
            .map_err(|e| anyhow!(Errors::TemplateError(SCRIPT_TEMPLATE_NAME.to_string(), e.to_string())))
    }

    /// Write the script to the output file, or to stdout without one.
    pub fn write_script(&self, output: Option<&str>) -> Result<()> {
        let script = self.render_script()?;
        match output {
            Some(file) => {
                let file = get_absolute_path(file);
                fs::write(&file, script).map_err(Errors::IOError)?;
                info!("Provisioning script for user {} written to {}", self.user, file);
            },
            None => print!("{}", script),
        }
        Ok(())
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::DbProvisioning;

    #[test]
    fn default_script_creates_cookbook_user() {
        let script = DbProvisioning::default().render_script().unwrap();
        assert!(script.contains("db.getSiblingDB(\"cookbook\").createUser({"));
        assert!(script.contains("  user: \"cookbook-user\","));
        assert!(script.contains("  pwd: \"cookbookuserpass\","));
        assert!(script.contains("roles: [{ role: \"readWrite\", db: \"cookbook\" }]"));
        assert!(script.contains("print('User created successfully');"));
        assert!(script.contains("print(\"Database: cookbook\");"));
        assert!(script.contains("print(\"User: cookbook-user\");"));
    }

    #[test]
    fn args_override_defaults() {
        let p = DbProvisioning::from_args(Some("recipes".to_string()), None, Some("s3cret".to_string()));
        assert_eq!(p.database, "recipes");
        assert_eq!(p.user, "cookbook-user");
        assert_eq!(p.password, "s3cret");
        assert_eq!(p.role, "readWrite");
    }

    #[test]
    fn values_are_quoted() {
        let p = DbProvisioning::from_args(None, None, Some("pa\"ss');drop".to_string()));
        let script = p.render_script().unwrap();
        assert!(script.contains(r#"pwd: "pa\"ss');drop","#));
    }

    #[test]
    fn script_written_to_file() {
        let path = std::env::temp_dir().join(format!("hello_init_db_{}.js", std::process::id()));
        let file = path.to_str().unwrap();
        DbProvisioning::default().write_script(Some(file)).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("createUser"));
        std::fs::remove_file(&path).unwrap();
    }
}
