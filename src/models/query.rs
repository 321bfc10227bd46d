use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowError {
    pub field: String,
    pub value: String,
    pub message: String,
}

impl WindowError {
    pub fn new(field: &str, value: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: campo '{}', valor '{}'", self.message, self.field, self.value)
    }
}

impl std::error::Error for WindowError {}

/// Arboviruses served by the InfoDengue alert API.
///
/// The API takes the disease as a lowercase string; `as_str` yields the
/// exact query-parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Dengue,
    Chikungunya,
    Zika,
}

impl Disease {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Dengue => "dengue",
            Disease::Chikungunya => "chikungunya",
            Disease::Zika => "zika",
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disease {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dengue" => Ok(Disease::Dengue),
            "chikungunya" => Ok(Disease::Chikungunya),
            "zika" => Ok(Disease::Zika),
            _ => Err(WindowError::new("disease", s, "Doença não suportada")),
        }
    }
}

/// Query window for one sweep: disease plus an epidemiological-week and
/// year range. Immutable per run.
///
/// # Example
/// ```rust
/// use infodengue_sweep::models::query::{Disease, QueryWindow};
///
/// let window = QueryWindow::new(Disease::Dengue, 1, 53, 2023, 2025).unwrap();
/// assert_eq!(window.ew_start, 1);
/// assert!(QueryWindow::new(Disease::Dengue, 0, 53, 2023, 2025).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub disease: Disease,
    /// Epidemiological week the window starts at (1-53)
    pub ew_start: u8,
    /// Epidemiological week the window ends at (1-53)
    pub ew_end: u8,
    pub ey_start: i32,
    pub ey_end: i32,
}

impl QueryWindow {
    pub fn new(
        disease: Disease,
        ew_start: u8,
        ew_end: u8,
        ey_start: i32,
        ey_end: i32,
    ) -> Result<Self, WindowError> {
        if !(1..=53).contains(&ew_start) {
            return Err(WindowError::new(
                "ew_start",
                &ew_start.to_string(),
                "Semana epidemiológica deve estar entre 1 e 53",
            ));
        }
        if !(1..=53).contains(&ew_end) {
            return Err(WindowError::new(
                "ew_end",
                &ew_end.to_string(),
                "Semana epidemiológica deve estar entre 1 e 53",
            ));
        }
        if ew_start > ew_end {
            return Err(WindowError::new(
                "ew_start",
                &format!("{ew_start}..{ew_end}"),
                "Semana inicial maior que a final",
            ));
        }
        if ey_start > ey_end {
            return Err(WindowError::new(
                "ey_start",
                &format!("{ey_start}..{ey_end}"),
                "Ano inicial maior que o final",
            ));
        }
        Ok(Self {
            disease,
            ew_start,
            ew_end,
            ey_start,
            ey_end,
        })
    }

    pub fn with_disease(mut self, disease: Disease) -> Self {
        self.disease = disease;
        self
    }
}

impl Default for QueryWindow {
    fn default() -> Self {
        Self {
            disease: Disease::Dengue,
            ew_start: 1,
            ew_end: 53,
            ey_start: 2023,
            ey_end: 2025,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disease_round_trip() {
        assert_eq!(Disease::Dengue.as_str(), "dengue");
        assert_eq!("chikungunya".parse::<Disease>().unwrap(), Disease::Chikungunya);
        assert_eq!(" ZIKA ".parse::<Disease>().unwrap(), Disease::Zika);
        assert!("malaria".parse::<Disease>().is_err());
    }

    #[test]
    fn test_window_validation() {
        assert!(QueryWindow::new(Disease::Dengue, 1, 53, 2023, 2025).is_ok());
        assert!(QueryWindow::new(Disease::Dengue, 0, 53, 2023, 2025).is_err());
        assert!(QueryWindow::new(Disease::Dengue, 1, 54, 2023, 2025).is_err());
        assert!(QueryWindow::new(Disease::Dengue, 20, 10, 2023, 2025).is_err());
        assert!(QueryWindow::new(Disease::Dengue, 1, 53, 2025, 2023).is_err());
    }

    #[test]
    fn test_window_default() {
        let window = QueryWindow::default();
        assert_eq!(window.disease, Disease::Dengue);
        assert_eq!(window.ew_start, 1);
        assert_eq!(window.ew_end, 53);
        assert_eq!(window.ey_start, 2023);
        assert_eq!(window.ey_end, 2025);
    }

    #[test]
    fn test_with_disease() {
        let window = QueryWindow::default().with_disease(Disease::Zika);
        assert_eq!(window.disease, Disease::Zika);
        assert_eq!(window.ew_start, 1);
    }
}
