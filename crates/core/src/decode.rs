//! Payload decoding for the feed endpoints.
//!
//! The feed response carries items plus two side tables (`profiles`, `groups`)
//! that items reference by `source_id`: positive ids are profiles, negative
//! ids are groups. Only photo attachments with an `r`-sized rendition are kept.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use smallvec::SmallVec;

use crate::{Attachment, FeedError, FeedItem, FeedResult, Page, Source, User};

#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Deserialize)]
struct RawFeed {
    items: Vec<RawItem>,
    profiles: Vec<RawProfile>,
    groups: Vec<RawGroup>,
    #[serde(default)]
    next_from: Option<String>,
}

#[derive(Deserialize)]
struct RawProfile {
    id: i64,
    first_name: String,
    last_name: String,
    photo_100: String,
}

#[derive(Deserialize)]
struct RawGroup {
    id: i64,
    name: String,
    photo_100: String,
}

#[derive(Deserialize)]
struct RawCount {
    count: i64,
}

#[derive(Deserialize)]
struct RawItem {
    source_id: i64,
    date: i64,
    text: String,
    #[serde(default)]
    attachments: Option<Vec<RawAttachment>>,
    likes: RawCount,
    comments: RawCount,
    reposts: RawCount,
    views: RawCount,
}

#[derive(Deserialize)]
struct RawAttachment {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    photo: Option<RawPhoto>,
}

#[derive(Deserialize)]
struct RawPhoto {
    sizes: Vec<RawSize>,
}

#[derive(Deserialize)]
struct RawSize {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

#[derive(Deserialize)]
struct RawUser {
    photo_100: String,
}

fn parse<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> FeedResult<T> {
    serde_json::from_slice(bytes).map_err(|e| FeedError::Decode(e.to_string()))
}

/// Decode one feed page. An empty `next_from` is treated as exhaustion.
pub fn decode_page(bytes: &[u8]) -> FeedResult<Page> {
    let env: Envelope<RawFeed> = parse(bytes)?;
    let feed = env.response;

    let mut sources: FxHashMap<i64, Source> = FxHashMap::default();
    for p in feed.profiles {
        let name = format!("{} {}", p.first_name, p.last_name);
        sources.insert(p.id, Source { id: p.id, name, image_link: p.photo_100 });
    }
    for g in feed.groups {
        sources.insert(-g.id, Source { id: -g.id, name: g.name, image_link: g.photo_100 });
    }

    let mut items = Vec::with_capacity(feed.items.len());
    for raw in feed.items {
        let source = sources
            .get(&raw.source_id)
            .cloned()
            .ok_or_else(|| FeedError::Decode(format!("unknown source_id {}", raw.source_id)))?;
        let mut attachments: SmallVec<[Attachment; 4]> = SmallVec::new();
        for a in raw.attachments.unwrap_or_default() {
            if let Some(att) = photo_attachment(a)? {
                attachments.push(att);
            }
        }
        items.push(FeedItem {
            source,
            date: raw.date,
            text: raw.text,
            attachments,
            likes: raw.likes.count,
            comments: raw.comments.count,
            reposts: raw.reposts.count,
            views: raw.views.count,
        });
    }

    let next_cursor = feed.next_from.filter(|c| !c.is_empty());
    Ok(Page { items, next_cursor })
}

fn photo_attachment(raw: RawAttachment) -> FeedResult<Option<Attachment>> {
    if raw.kind != "photo" {
        return Ok(None);
    }
    let photo = raw
        .photo
        .ok_or_else(|| FeedError::Decode("photo attachment without photo body".into()))?;
    Ok(photo
        .sizes
        .into_iter()
        .find(|s| s.kind == "r")
        .map(|s| Attachment { image_link: s.url }))
}

/// Decode the signed-in user's profile (first element of `response`).
pub fn decode_user(bytes: &[u8]) -> FeedResult<User> {
    let env: Envelope<Vec<RawUser>> = parse(bytes)?;
    let first = env
        .response
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::Decode("empty user response".into()))?;
    Ok(User { image_link: first.photo_100 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_json(next_from: &str) -> String {
        serde_json::json!({
            "response": {
                "items": [
                    {
                        "source_id": 7, "date": 1541930000, "text": "hello",
                        "likes": {"count": 3}, "comments": {"count": 1},
                        "reposts": {"count": 0}, "views": {"count": 1200},
                        "attachments": [
                            {"type": "photo", "photo": {"sizes": [
                                {"type": "m", "url": "https://img/m.jpg"},
                                {"type": "r", "url": "https://img/r.jpg"}
                            ]}},
                            {"type": "link", "link": {}},
                            {"type": "photo", "photo": {"sizes": [{"type": "s", "url": "https://img/s.jpg"}]}}
                        ]
                    },
                    {
                        "source_id": -42, "date": 1541930100, "text": "",
                        "likes": {"count": 0}, "comments": {"count": 0},
                        "reposts": {"count": 0}, "views": {"count": 0}
                    }
                ],
                "profiles": [{"id": 7, "first_name": "Ivan", "last_name": "P", "photo_100": "https://img/p7.jpg"}],
                "groups": [{"id": 42, "name": "Rustaceans", "photo_100": "https://img/g42.jpg"}],
                "next_from": next_from
            }
        })
        .to_string()
    }

    #[test]
    fn resolves_sources_and_filters_attachments() {
        let page = decode_page(feed_json("5/abc").as_bytes()).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].source.name, "Ivan P");
        assert_eq!(page.items[0].attachments.len(), 1);
        assert_eq!(page.items[0].attachments[0].image_link, "https://img/r.jpg");
        assert_eq!(page.items[0].views, 1200);
        assert_eq!(page.items[1].source.name, "Rustaceans");
        assert_eq!(page.items[1].source.id, -42);
        assert!(page.items[1].attachments.is_empty());
        assert_eq!(page.next_cursor.as_deref(), Some("5/abc"));
    }

    #[test]
    fn empty_next_from_means_exhausted() {
        let page = decode_page(feed_json("").as_bytes()).unwrap();
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn unknown_source_is_decode_error() {
        let body = serde_json::json!({"response": {
            "items": [{"source_id": 9, "date": 0, "text": "",
                "likes": {"count": 0}, "comments": {"count": 0},
                "reposts": {"count": 0}, "views": {"count": 0}}],
            "profiles": [], "groups": []
        }});
        let err = decode_page(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        assert!(matches!(decode_page(b"{not json"), Err(FeedError::Decode(_))));
        assert!(matches!(decode_user(br#"{"response": []}"#), Err(FeedError::Decode(_))));
    }

    #[test]
    fn user_avatar() {
        let u = decode_user(br#"{"response": [{"id": 1, "photo_100": "https://img/me.jpg"}]}"#).unwrap();
        assert_eq!(u.image_link, "https://img/me.jpg");
    }
}
