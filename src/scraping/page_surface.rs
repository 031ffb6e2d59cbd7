use super::scripts;
use crate::interaction::surface::PageSurface;
use crate::types::{CardProbe, ViewportInfo};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use rand::distr::{Distribution, Uniform};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// [`PageSurface`] over a live CDP page.
#[derive(Debug, Clone)]
pub struct CdpPageSurface {
    page: Page,
}

impl CdpPageSurface {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("evaluate failed: {}", e))?
            .into_value::<T>()
            .map_err(|e| anyhow!("unexpected evaluate result: {}", e))
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<()> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(x).y(y);
        if kind != DispatchMouseEventType::MouseMoved {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(|e| anyhow!(e))?;
        self.page.execute(params).await?;
        Ok(())
    }
}

/// Windows virtual key code for the few keys the engine presses.
fn virtual_key_code(key: &str) -> Option<i64> {
    match key {
        "Escape" => Some(27),
        "Enter" => Some(13),
        "Tab" => Some(9),
        _ => None,
    }
}

#[async_trait]
impl PageSurface for CdpPageSurface {
    async fn viewport(&self) -> Result<ViewportInfo> {
        self.eval(scripts::VIEWPORT).await
    }

    async fn card_probes(&self, marker: &str) -> Result<Vec<CardProbe>> {
        let raw: Vec<Value> = self.eval(&scripts::card_probe_script(marker)).await?;
        // One malformed entry must not cost the whole pass.
        Ok(raw
            .into_iter()
            .filter_map(|v| serde_json::from_value::<CardProbe>(v).ok())
            .collect())
    }

    async fn probe(&self, script: &str) -> Result<bool> {
        let value: Value = self.eval(script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn drain_capture_buffer(&self) -> Result<Vec<Value>> {
        let value: Value = self.eval(scripts::DRAIN_BUFFER).await?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(anyhow!("capture buffer is not an array: {}", other)),
        }
    }

    async fn install_capture_hook(&self) -> Result<()> {
        // Future documents get the hook before their own scripts run; the
        // current one gets it right away.
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(scripts::CAPTURE_HOOK))
            .await
            .map_err(|e| anyhow!("Failed to register capture hook: {}", e))?;
        let _: Value = self.eval(scripts::CAPTURE_HOOK).await?;
        Ok(())
    }

    async fn click(&self, x: f64, y: f64) -> Result<()> {
        let hold_ms = {
            let mut rng = rand::rng();
            let dist = Uniform::new(50u64, 100).map_err(|e| anyhow!(e))?;
            dist.sample(&mut rng)
        };
        self.mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
        tokio::time::sleep(Duration::from_millis(hold_ms)).await;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y).await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key(key.to_string())
                .code(key.to_string());
            if let Some(vk) = virtual_key_code(key) {
                builder = builder
                    .windows_virtual_key_code(vk)
                    .native_virtual_key_code(vk);
            }
            let params = builder.build().map_err(|e| anyhow!(e))?;
            self.page.execute(params).await?;
        }
        Ok(())
    }

    async fn wheel(&self, x: f64, y: f64, delta_y: f64) -> Result<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(x)
            .y(y)
            .delta_x(0.0)
            .delta_y(delta_y)
            .build()
            .map_err(|e| anyhow!(e))?;
        self.page.execute(params).await?;
        Ok(())
    }
}
