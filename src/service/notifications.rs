//! News-driven notification generation for one member or the whole household.

use crate::config::NewsConfig;
use crate::db::{DbNotification, HomeStorage, NewNotification};
use crate::error::HubError;
use crate::llm::{DraftNotification, NotificationModel, SelectionRequest};
use crate::news::{FeedCatalog, RssItem, fetch_all};
use crate::types::member::Preferences;
use crate::types::notification::{NotificationKind, NotificationSource};
use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tracing::info;

const NO_NEWS: &str = "Nenhuma notícia disponível no momento.";

const SYSTEM_PROMPT: &str = "Você é um assistente que seleciona e resume notícias REAIS para um feed personalizado.

REGRAS OBRIGATÓRIAS:
- Você DEVE selecionar notícias APENAS da lista de notícias reais fornecida abaixo
- NÃO invente notícias. Use SOMENTE as manchetes reais fornecidas
- Resuma cada notícia em título curto (max 60 chars) e descrição breve (max 120 chars)
- Se a pessoa tem preferências, priorize notícias relacionadas aos interesses dela
- Se houver notícias do time de futebol da pessoa, SEMPRE inclua
- NÃO fale sobre economia de energia, automação ou configurações da casa
- Escolha as 5 notícias mais relevantes e interessantes
- Para cada notificação, escolha um tipo: info (geral), alert (urgente/importante), reminder (lembrete), task (ação)
- Use linguagem natural brasileira, como manchetes de portal de notícias";

/// Who the batch is for.
pub struct Audience {
    pub member_id: Option<i64>,
    pub name: String,
    pub preferences: Option<Preferences>,
}

impl Audience {
    pub fn household() -> Self {
        Self {
            member_id: None,
            name: "Geral".to_string(),
            preferences: None,
        }
    }
}

/// Items recent enough to mention, capped for the prompt.
pub fn news_context(items: &[RssItem], now: DateTime<Utc>, cfg: &NewsConfig) -> Vec<String> {
    let cutoff = now - Duration::hours(cfg.recent_window_hours);
    items
        .iter()
        .filter(|item| item.is_recent(cutoff))
        .take(cfg.max_context_items)
        .map(RssItem::context_line)
        .collect()
}

pub fn build_prompts(audience: &Audience, context: &[String], now: DateTime<Utc>) -> SelectionRequest {
    let today = now.format("%d/%m/%Y, %H:%M UTC");
    let news = if context.is_empty() {
        NO_NEWS.to_string()
    } else {
        context.join("\n")
    };
    let preferences = audience
        .preferences
        .as_ref()
        .map(Preferences::describe)
        .filter(|p| !p.is_empty());

    let user_prompt = match (audience.member_id, preferences) {
        (Some(_), Some(preferences)) => format!(
            "Selecione as 5 notícias mais relevantes para {name}.\n\
             Preferências: {preferences}.\n\
             Data: {today}.\n\n\
             NOTÍCIAS REAIS DISPONÍVEIS:\n{news}\n\n\
             Escolha as que mais se encaixam nos interesses da pessoa. Se não houver notícias sobre os interesses específicos, escolha as mais importantes do dia.",
            name = audience.name,
        ),
        _ => format!(
            "Selecione as 5 notícias mais importantes e variadas para HOJE ({today}).\n\n\
             NOTÍCIAS REAIS DISPONÍVEIS:\n{news}\n\n\
             Escolha uma boa variedade: esportes, tecnologia, brasil, entretenimento, etc."
        ),
    };
    SelectionRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
    }
}

fn to_new_notification(draft: DraftNotification) -> Option<NewNotification> {
    let title = draft.title.trim();
    if title.is_empty() {
        return None;
    }
    Some(NewNotification {
        member_id: None,
        title: title.to_string(),
        message: draft.message.trim().to_string(),
        kind: NotificationKind::parse_lenient(&draft.kind),
        source: NotificationSource::Generated,
    })
}

/// Everything one generation run needs.
pub struct NotificationPipeline<'a> {
    pub storage: &'a HomeStorage,
    pub http: &'a reqwest::Client,
    pub model: &'a dyn NotificationModel,
    pub feeds: &'a FeedCatalog,
    pub news: &'a NewsConfig,
}

impl NotificationPipeline<'_> {
    /// Select feeds, fetch news, ask the model, then swap the stored batch.
    /// Nothing is written unless the model call succeeds.
    pub async fn run(
        &self,
        user_id: &str,
        member_id: Option<i64>,
    ) -> Result<Vec<DbNotification>, HubError> {
        let audience = match member_id {
            Some(id) => {
                let member = self.storage.get_member(user_id, id).await?;
                Audience {
                    member_id: Some(member.id),
                    name: member.name,
                    preferences: Some(member.preferences),
                }
            }
            None => Audience::household(),
        };

        let sources = self.feeds.select(audience.preferences.as_ref());
        let items = fetch_all(
            self.http,
            &sources,
            StdDuration::from_secs(self.news.fetch_timeout_secs),
            self.news.max_items_per_feed,
        )
        .await;
        let now = Utc::now();
        let context = news_context(&items, now, self.news);
        info!(
            user_id,
            member_id,
            feeds = sources.len(),
            fetched = items.len(),
            recent = context.len(),
            "news collected"
        );

        let request = build_prompts(&audience, &context, now);
        let drafts = self.model.select(&request).await?;
        let batch: Vec<NewNotification> = drafts
            .into_iter()
            .filter_map(to_new_notification)
            .take(self.news.notifications_per_batch)
            .collect();

        let stored = self
            .storage
            .replace_generated(user_id, audience.member_id, batch)
            .await?;
        info!(user_id, member_id, count = stored.len(), model = self.model.name(), "notifications generated");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::FeedCategory;

    fn item(title: &str, pub_date: &str) -> RssItem {
        RssItem {
            title: title.to_string(),
            description: "d".to_string(),
            link: String::new(),
            pub_date: pub_date.to_string(),
            category: FeedCategory::General,
        }
    }

    #[test]
    fn context_drops_stale_items_and_keeps_undated() {
        let now = DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let items = vec![
            item("fresh", "Tue, 10 Mar 2026 08:00:00 +0000"),
            item("stale", "Fri, 06 Mar 2026 08:00:00 +0000"),
            item("undated", ""),
        ];
        let ctx = news_context(&items, now, &NewsConfig::default());
        assert_eq!(ctx.len(), 2);
        assert!(ctx[0].contains("fresh"));
        assert!(ctx[1].contains("undated"));
    }

    #[test]
    fn context_is_capped() {
        let items: Vec<RssItem> = (0..50).map(|i| item(&format!("n{i}"), "")).collect();
        let ctx = news_context(&items, Utc::now(), &NewsConfig::default());
        assert_eq!(ctx.len(), 30);
    }

    #[test]
    fn member_prompt_mentions_preferences() {
        let audience = Audience {
            member_id: Some(1),
            name: "Ana".to_string(),
            preferences: Some(Preferences {
                sports: vec!["Flamengo".into()],
                ..Default::default()
            }),
        };
        let req = build_prompts(&audience, &["[ESPORTES] Gol - d".to_string()], Utc::now());
        assert!(req.user_prompt.contains("para Ana"));
        assert!(req.user_prompt.contains("Times/esportes: Flamengo"));
        assert!(req.user_prompt.contains("[ESPORTES] Gol"));
    }

    #[test]
    fn household_prompt_without_news() {
        let req = build_prompts(&Audience::household(), &[], Utc::now());
        assert!(req.user_prompt.contains("mais importantes e variadas"));
        assert!(req.user_prompt.contains(NO_NEWS));
    }

    #[test]
    fn untitled_drafts_are_dropped() {
        let draft = |title: &str, kind: &str| DraftNotification {
            title: title.to_string(),
            message: "m".to_string(),
            kind: kind.to_string(),
        };
        assert!(to_new_notification(draft("  ", "info")).is_none());
        let n = to_new_notification(draft("Gol!", "ALERT")).unwrap();
        assert_eq!(n.kind, NotificationKind::Alert);
        assert_eq!(n.source, NotificationSource::Generated);
    }
}
