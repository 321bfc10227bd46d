use crate::errors::{SweepError, SweepResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default base URL of the IBGE localities API
pub const IBGE_LOCALITIES_URL: &str = "https://servicodados.ibge.gov.br/api/v1/localidades";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateNotFoundError {
    pub state: String,
    pub message: String,
}

impl StateNotFoundError {
    pub fn new(state: &str, message: &str) -> Self {
        Self {
            state: state.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for StateNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}'", self.message, self.state)
    }
}

impl std::error::Error for StateNotFoundError {}

/// Representation of a Brazilian Federative Unit (State).
///
/// # Example
/// ```rust
/// use infodengue_sweep::models::geo_utils::StateBR;
///
/// let parana = StateBR::new(41, "Paraná", "PR");
/// assert_eq!(parana.code, 41);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBR {
    /// IBGE code of the state
    pub code: u8,
    pub name: String,
    /// State abbreviation (2 letters)
    pub uf: String,
}

impl StateBR {
    pub fn new(code: u8, name: &str, uf: &str) -> Self {
        Self {
            code,
            name: name.to_string(),
            uf: uf.to_string(),
        }
    }
}

/// Mapping of UF abbreviations to their complete state data.
pub static UFS: Lazy<HashMap<&'static str, StateBR>> = Lazy::new(|| {
    [
        (11, "Rondônia", "RO"),
        (12, "Acre", "AC"),
        (13, "Amazonas", "AM"),
        (14, "Roraima", "RR"),
        (15, "Pará", "PA"),
        (16, "Amapá", "AP"),
        (17, "Tocantins", "TO"),
        (21, "Maranhão", "MA"),
        (22, "Piauí", "PI"),
        (23, "Ceará", "CE"),
        (24, "Rio Grande do Norte", "RN"),
        (25, "Paraíba", "PB"),
        (26, "Pernambuco", "PE"),
        (27, "Alagoas", "AL"),
        (28, "Sergipe", "SE"),
        (29, "Bahia", "BA"),
        (31, "Minas Gerais", "MG"),
        (32, "Espírito Santo", "ES"),
        (33, "Rio de Janeiro", "RJ"),
        (35, "São Paulo", "SP"),
        (41, "Paraná", "PR"),
        (42, "Santa Catarina", "SC"),
        (43, "Rio Grande do Sul", "RS"),
        (50, "Mato Grosso do Sul", "MS"),
        (51, "Mato Grosso", "MT"),
        (52, "Goiás", "GO"),
        (53, "Distrito Federal", "DF"),
    ]
    .into_iter()
    .map(|(code, name, uf)| (uf, StateBR::new(code, name, uf)))
    .collect()
});

/// Get state information by UF abbreviation (case insensitive).
pub fn get_state_info(uf: &str) -> Result<StateBR, StateNotFoundError> {
    let uf_upper = uf.trim().to_uppercase();
    UFS.get(uf_upper.as_str())
        .cloned()
        .ok_or_else(|| StateNotFoundError::new(uf, "UF não encontrada"))
}

/// One municipality of the target state, as resolved from the IBGE
/// directory. The geocode is the opaque stable key of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub name: String,
    pub geocode: u32,
}

#[derive(Debug, Deserialize)]
struct IbgeMunicipio {
    id: u32,
    nome: String,
}

/// Directory provider backed by the IBGE localities API.
///
/// Resolved once per run; any transport, status, or parse problem is
/// fatal (`SweepError::DirectoryUnavailable`) since the sweep needs the
/// full municipality list for accurate summary statistics. No retry.
#[derive(Debug, Clone)]
pub struct IbgeDirectory {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl IbgeDirectory {
    /// Create a directory resolver with IBGE defaults
    pub fn new_ibge() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: IBGE_LOCALITIES_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch every municipality of `state`, preserving the order the IBGE
    /// API returns them in. That order is the iteration order of the run.
    pub async fn resolve_municipalities(&self, state: &StateBR) -> SweepResult<Vec<Municipality>> {
        let url = format!("{}/estados/{}/municipios", self.base_url, state.code);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SweepError::DirectoryUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SweepError::DirectoryUnavailable(format!(
                "HTTP status {status} em {url}"
            )));
        }

        let municipios: Vec<IbgeMunicipio> = response
            .json()
            .await
            .map_err(|e| SweepError::DirectoryUnavailable(e.to_string()))?;

        Ok(municipios
            .into_iter()
            .map(|m| Municipality {
                name: m.nome,
                geocode: m.id,
            })
            .collect())
    }
}
