use std::{fs, io::Write, path::Path};

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use crate::{builder::DecimalBuilder, decimal::Decimal};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemWeight {
    pub item: String,
    pub weight: Decimal,
}

/// A weighted population stored as TOML:
///
/// ```toml
/// [[items]]
/// item = "apple"
/// weight = 2.5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightsFile {
    #[serde(default)]
    pub items: Vec<ItemWeight>,
}

impl WeightsFile {
    pub fn push(&mut self, item: impl Into<String>, weight: impl Into<Decimal>) {
        self.items.push(ItemWeight {
            item: item.into(),
            weight: weight.into(),
        });
    }

    pub fn into_builder(self) -> Result<DecimalBuilder<String>> {
        let mut builder = DecimalBuilder::decimal();
        for ItemWeight { item, weight } in self.items {
            builder
                .add(item.clone(), weight)
                .map_err(|e| eyre!("item `{item}`: {e}"))?;
        }
        Ok(builder)
    }
}

pub fn read_weights(path: impl AsRef<Path>) -> Result<WeightsFile> {
    let s = fs::read_to_string(&path)
        .map_err(|e| eyre!("read_weights({:?}) err: {e}", path.as_ref().to_str()))?;
    toml::from_str(&s).map_err(|e| eyre!("weights deserialize err: {e}"))
}

pub fn write_weights(content: &WeightsFile, path: impl AsRef<Path>) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path.as_ref())
        .map_err(|e| eyre!("open file({:?}) failed: {e}", path.as_ref().to_str()))?;
    file.write_all(toml::to_string_pretty(content)?.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
