use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, ORIGIN, REFERER};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Profile;
use crate::error::BotError;
use crate::game::combo::{ComboFeed, ComboHint};
use crate::game::state::{AccountState, Boost, DailyCombo, GameConfig, Task, Upgrade};
use crate::network::client::{GameClient, PurchaseOutcome};
use crate::protocol::{
    BoostsResponse, BuyBoostRequest, BuyUpgradeRequest, BuyUpgradeResponse, CheckTaskRequest,
    CheckTaskResponse, ClaimCipherRequest, ConfigResponse, SelectExchangeRequest, TapRequest,
    TasksResponse, UpgradesResponse, UserResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const WEB_ORIGIN: &str = "https://hamsterkombatgame.io";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Turn a non-success response into the matching error class.
async fn check_status(response: Response) -> Result<Response, BotError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(BotError::from_status(status, text))
}

/// `GameClient` backed by the game's HTTPS API.
pub struct HttpGameClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpGameClient {
    pub fn new(base_url: &str, profile: &Profile) -> Result<Self, BotError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));
        headers.insert(ORIGIN, HeaderValue::from_static(WEB_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static("https://hamsterkombatgame.io/"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-site"));

        let user_agent = profile.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT);

        if let Some(proxy) = &profile.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| BotError::Config(format!("Invalid proxy for {}: {}", profile.name, e)))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| BotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: profile.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, BotError> {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, BotError> {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl GameClient for HttpGameClient {
    async fn fetch_account(&self) -> Result<AccountState, BotError> {
        let response: UserResponse = self.post_empty("clicker/sync").await?;
        Ok(response.clicker_user.into())
    }

    async fn fetch_upgrades(&self) -> Result<(Vec<Upgrade>, DailyCombo), BotError> {
        let response: UpgradesResponse = self.post_empty("clicker/upgrades-for-buy").await?;
        let upgrades = response.upgrades_for_buy.into_iter().map(Upgrade::from).collect();
        Ok((upgrades, response.daily_combo))
    }

    async fn fetch_boosts(&self) -> Result<Vec<Boost>, BotError> {
        let response: BoostsResponse = self.post_empty("clicker/boosts-for-buy").await?;
        Ok(response.boosts_for_buy.into_iter().map(Boost::from).collect())
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>, BotError> {
        let response: TasksResponse = self.post_empty("clicker/list-tasks").await?;
        Ok(response.tasks)
    }

    async fn fetch_config(&self) -> Result<GameConfig, BotError> {
        let response: ConfigResponse = self.post_empty("clicker/config").await?;
        Ok(GameConfig {
            daily_cipher: response.daily_cipher,
        })
    }

    async fn select_exchange(&self, exchange_id: &str) -> Result<bool, BotError> {
        let body = SelectExchangeRequest {
            exchange_id: exchange_id.to_string(),
        };
        let response: UserResponse = self.post_json("clicker/select-exchange", &body).await?;
        Ok(response.clicker_user.exchange_id.as_deref() == Some(exchange_id))
    }

    async fn claim_cipher(&self, decoded: &str) -> Result<AccountState, BotError> {
        let body = ClaimCipherRequest {
            cipher: decoded.to_string(),
        };
        let response: UserResponse = self.post_json("clicker/claim-daily-cipher", &body).await?;
        Ok(response.clicker_user.into())
    }

    async fn claim_combo(&self) -> Result<AccountState, BotError> {
        let response: UserResponse = self.post_empty("clicker/claim-daily-combo").await?;
        Ok(response.clicker_user.into())
    }

    async fn buy_upgrade(&self, upgrade_id: &str) -> Result<PurchaseOutcome, BotError> {
        let body = BuyUpgradeRequest {
            upgrade_id: upgrade_id.to_string(),
            timestamp: now_secs(),
        };
        let response: BuyUpgradeResponse = self.post_json("clicker/buy-upgrade", &body).await?;
        Ok(PurchaseOutcome {
            account: response.clicker_user.into(),
            upgrades: response.upgrades_for_buy.into_iter().map(Upgrade::from).collect(),
            daily_combo: response.daily_combo,
        })
    }

    async fn apply_boost(&self, boost_id: &str) -> Result<AccountState, BotError> {
        let body = BuyBoostRequest {
            boost_id: boost_id.to_string(),
            timestamp: now_secs(),
        };
        let response: UserResponse = self.post_json("clicker/buy-boost", &body).await?;
        Ok(response.clicker_user.into())
    }

    async fn send_taps(&self, energy: i64, taps: i64) -> Result<AccountState, BotError> {
        let body = TapRequest {
            count: taps,
            available_taps: energy,
            timestamp: now_secs(),
        };
        let response: UserResponse = self.post_json("clicker/tap", &body).await?;
        Ok(response.clicker_user.into())
    }

    async fn complete_task(&self, task_id: &str) -> Result<bool, BotError> {
        let body = CheckTaskRequest {
            task_id: task_id.to_string(),
        };
        let response: CheckTaskResponse = self.post_json("clicker/check-task", &body).await?;
        Ok(response.task.is_completed)
    }
}

/// Combo hints published as a small JSON document.
pub struct HttpComboFeed {
    http: Client,
    url: String,
}

impl HttpComboFeed {
    pub fn new(url: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, url }
    }
}

impl ComboFeed for HttpComboFeed {
    async fn fetch(&self) -> Result<ComboHint, BotError> {
        let response = self.http.get(&self.url).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
