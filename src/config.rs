use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub demo: Demo,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Demo {
    /// Bind the demo feed to this community instead of the global scope.
    pub community: Option<String>,
    #[serde(default = "display_name_default")]
    pub display_name: String,
}

impl Default for Demo {
    fn default() -> Self {
        Demo {
            community: None,
            display_name: display_name_default(),
        }
    }
}

fn display_name_default() -> String {
    String::from("Ada")
}

pub fn process_config() -> anyhow::Result<Config> {
    let path = std::env::var("AGORA_CONFIG").unwrap_or_else(|_| String::from("agora.toml"));
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(toml::from_str(&raw)?),
        Err(_) => Ok(Config::default()),
    }
}
