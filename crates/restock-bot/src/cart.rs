//! Shopping cart file: the list of items to buy.
//!
//! ```json
//! {"goods": [{"skuid": "100012043978", "areaid": "1_72_2799_0", "count": 1,
//!             "buytime": "2022-08-06 00:00:00"}]}
//! ```
//!
//! Only `skuid` is mandatory. Ids may be written as strings or numbers.

use crate::config::BuyerConfig;
use crate::error::{AppError, AppResult};
use restock_core::{parse_buy_time, AreaId, CoreError, ItemTask, SkuId, IMMEDIATE_BUY_TIME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default shopping cart file.
pub const DEFAULT_CART_PATH: &str = "shopping_cart.json";

/// Identifier written as a JSON string or number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Text(String),
    Number(u64),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One cart entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodEntry {
    #[serde(default)]
    pub skuid: Option<IdValue>,
    #[serde(default)]
    pub areaid: Option<IdValue>,
    /// Quantity. Default: 1.
    #[serde(default)]
    pub count: Option<u32>,
    /// Local `%Y-%m-%d %H:%M:%S`. Default: immediately.
    #[serde(default)]
    pub buytime: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default)]
    pub goods: Vec<GoodEntry>,
}

impl CartConfig {
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read cart {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> AppResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse cart: {e}")))
    }

    /// Build one validated task per entry.
    ///
    /// Fails on the first invalid entry; entries are numbered from 1 in
    /// error messages.
    pub fn to_tasks(&self, buyer: &BuyerConfig) -> AppResult<Vec<ItemTask>> {
        let retry = buyer.retry_policy()?;
        let stock_interval = buyer.stock_interval();

        self.goods
            .iter()
            .enumerate()
            .map(|(i, good)| {
                let index = i + 1;
                let sku = match &good.skuid {
                    Some(id) => SkuId::new(id.to_string())?,
                    None => return Err(CoreError::MissingSkuId { index }.into()),
                };
                let area = match (&good.areaid, &buyer.default_area_id) {
                    (Some(id), _) => AreaId::new(id.to_string())?,
                    (None, Some(default)) => AreaId::new(default.as_str())?,
                    (None, None) => {
                        return Err(AppError::Config(format!(
                            "Item #{index} ({sku}) has no areaid and buyer.default_area_id is not set"
                        )))
                    }
                };
                let buy_time =
                    parse_buy_time(good.buytime.as_deref().unwrap_or(IMMEDIATE_BUY_TIME))?;

                Ok(ItemTask::new(
                    sku,
                    area,
                    good.count.unwrap_or(1),
                    stock_interval,
                    retry,
                    buy_time,
                )?)
            })
            .collect()
    }
}
