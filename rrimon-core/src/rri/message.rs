use std::fmt;

use crate::error::{Result, RriError};

pub const PROTOCOL_VERSION: &str = "5.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Check,
    Logout,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Login => "LOGIN",
            Action::Check => "CHECK",
            Action::Logout => "LOGOUT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An RRI order in key-value form.
#[derive(Clone, PartialEq, Eq)]
pub struct Query {
    action: Action,
    fields: Vec<(&'static str, String)>,
}

impl Query {
    pub fn login(user: &str, password: &str) -> Self {
        Self {
            action: Action::Login,
            fields: vec![("user", user.to_string()), ("password", password.to_string())],
        }
    }

    pub fn check_domain(domain: &str) -> Self {
        Self {
            action: Action::Check,
            fields: vec![("domain", domain.to_string())],
        }
    }

    pub fn logout() -> Self {
        Self {
            action: Action::Logout,
            fields: Vec::new(),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn encode(&self) -> String {
        let mut out = format!("version: {}\naction: {}", PROTOCOL_VERSION, self.action);
        for (key, value) in &self.fields {
            out.push('\n');
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
        }
        out
    }
}

// Keeps LOGIN passwords out of logs.
impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, if *k == "password" { "<redacted>" } else { v.as_str() }))
            .collect();
        f.debug_struct("Query")
            .field("action", &self.action)
            .field("fields", &fields)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    Failed,
}

/// A parsed RRI answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    result: ResultCode,
    infos: Vec<String>,
    errors: Vec<String>,
    fields: Vec<(String, String)>,
}

impl Response {
    pub fn success() -> Self {
        Self::with_result(ResultCode::Success)
    }

    pub fn failed() -> Self {
        Self::with_result(ResultCode::Failed)
    }

    fn with_result(result: ResultCode) -> Self {
        Self {
            result,
            infos: Vec::new(),
            errors: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut result = None;
        let mut infos = Vec::new();
        let mut errors = Vec::new();
        let mut fields = Vec::new();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(RriError::Protocol(format!("malformed response line: {}", line)));
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();

            match key.as_str() {
                "result" => {
                    result = Some(match value.to_ascii_lowercase().as_str() {
                        "success" => ResultCode::Success,
                        "failed" => ResultCode::Failed,
                        other => {
                            return Err(RriError::Protocol(format!("unknown result: {}", other)))
                        }
                    });
                }
                "info" => infos.push(value),
                "error" => errors.push(value),
                _ => fields.push((key, value)),
            }
        }

        let result =
            result.ok_or_else(|| RriError::Protocol("response without RESULT".to_string()))?;

        Ok(Self {
            result,
            infos,
            errors,
            fields,
        })
    }

    pub fn is_successful(&self) -> bool {
        self.result == ResultCode::Success
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn infos(&self) -> &[String] {
        &self.infos
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// First value of a non-result field, key matched case-insensitively.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Server error lines joined for an error message.
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            "no error given".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}
