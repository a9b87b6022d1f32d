//! Shaped projections of player and playlist responses for the device.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Flattened "now playing" summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
	/// Whether playback is active.
	pub is_playing: bool,
	/// Playback position in milliseconds.
	pub progress_ms: Option<u64>,
	/// Track title.
	pub track_name: String,
	/// First credited artist.
	pub artist_name: String,
	/// Album title.
	pub album_name: String,
	/// Track length in milliseconds.
	pub duration_ms: u64,
	/// Smallest album artwork.
	pub cover_url: Option<String>,
	/// Shuffle flag.
	pub shuffle: Option<bool>,
	/// Repeat mode (`off`, `track`, or `context`).
	pub repeat_mode: Option<String>,
}
impl NowPlaying {
	/// Projects a player state document, substituting defaults for anything absent.
	///
	/// `Value::Null` (nothing playing) yields every default.
	pub fn from_upstream(player: &Value) -> Self {
		let text =
			|pointer: &str| player.pointer(pointer).and_then(Value::as_str).map(str::to_owned);

		Self {
			is_playing: player.pointer("/is_playing").and_then(Value::as_bool).unwrap_or(false),
			progress_ms: player.pointer("/progress_ms").and_then(Value::as_u64),
			track_name: text("/item/name").unwrap_or_else(|| "Unknown".into()),
			artist_name: text("/item/artists/0/name").unwrap_or_else(|| "Unknown".into()),
			album_name: text("/item/album/name").unwrap_or_default(),
			duration_ms: player.pointer("/item/duration_ms").and_then(Value::as_u64).unwrap_or(0),
			cover_url: player
				.pointer("/item/album/images")
				.and_then(Value::as_array)
				.and_then(|images| images.last())
				.and_then(|image| image.get("url"))
				.and_then(Value::as_str)
				.map(str::to_owned),
			shuffle: player.pointer("/shuffle_state").and_then(Value::as_bool),
			repeat_mode: text("/repeat_state"),
		}
	}
}

/// Playlist reduced to what the device menu shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
	/// Playlist identifier.
	pub id: String,
	/// Display name.
	pub name: String,
}

/// Projects a paged playlist listing; entries without an `id` are skipped.
pub fn playlists_from_upstream(page: &Value) -> Vec<PlaylistSummary> {
	page.get("items")
		.and_then(Value::as_array)
		.map(|items| {
			items
				.iter()
				.filter_map(|item| {
					let id = item.get("id").and_then(Value::as_str)?;
					let name = item.get("name").and_then(Value::as_str).unwrap_or_default();

					Some(PlaylistSummary { id: id.to_owned(), name: name.to_owned() })
				})
				.collect()
		})
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn now_playing_reads_nested_fields() {
		let player = json!({
			"is_playing": true,
			"progress_ms": 1200,
			"shuffle_state": false,
			"repeat_state": "context",
			"item": {
				"name": "Song",
				"duration_ms": 180000,
				"artists": [{ "name": "First" }, { "name": "Second" }],
				"album": {
					"name": "Album",
					"images": [{ "url": "large" }, { "url": "medium" }, { "url": "small" }]
				}
			}
		});
		let now = NowPlaying::from_upstream(&player);

		assert!(now.is_playing);
		assert_eq!(now.progress_ms, Some(1200));
		assert_eq!(now.track_name, "Song");
		assert_eq!(now.artist_name, "First");
		assert_eq!(now.album_name, "Album");
		assert_eq!(now.duration_ms, 180000);
		assert_eq!(now.cover_url.as_deref(), Some("small"));
		assert_eq!(now.shuffle, Some(false));
		assert_eq!(now.repeat_mode.as_deref(), Some("context"));
	}

	#[test]
	fn now_playing_defaults_missing_fields() {
		for player in [Value::Null, json!({ "item": { "artists": [] } })] {
			let now = NowPlaying::from_upstream(&player);

			assert!(!now.is_playing);
			assert_eq!(now.track_name, "Unknown");
			assert_eq!(now.artist_name, "Unknown");
			assert_eq!(now.album_name, "");
			assert_eq!(now.duration_ms, 0);
			assert_eq!(now.cover_url, None);
		}
	}

	#[test]
	fn playlists_skip_entries_without_id() {
		let page = json!({
			"items": [{ "id": "a", "name": "Mix" }, { "name": "orphan" }, { "id": "b" }]
		});

		assert_eq!(
			playlists_from_upstream(&page),
			vec![
				PlaylistSummary { id: "a".into(), name: "Mix".into() },
				PlaylistSummary { id: "b".into(), name: String::new() },
			]
		);
		assert!(playlists_from_upstream(&json!({})).is_empty());
	}
}
