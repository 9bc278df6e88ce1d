//! Prompt rendering.

use super::context::UserMusicContext;
use lazy_static::lazy_static;

pub const RECOMMENDATION_COUNT: usize = 5;

pub const SYSTEM_PROMPT: &str =
    "You are a music expert who recommends music that matches the user's taste.";

const INSTRUCTIONS_INTRO: &str =
    "As a music expert, recommend tracks that suit the user based on the information below.";

const INSTRUCTIONS_BODY: &str = r#"include the following for each one:
- Track name
- Artist name
- Album the track appears on
- Why you recommend this track (how it matches the user's taste)

Return your answer in the following JSON format:
{
  "recommendations": [
    {
      "track_name": "Track name",
      "artist_name": "Artist name",
      "album_name": "Album name",
      "explanation": "Why this track is recommended"
    },
    ... (same for the remaining tracks)
  ]
}

Respond with the JSON above only, without any extra explanation or decoration."#;

lazy_static! {
    static ref INSTRUCTIONS: String = format!(
        "{}\nRecommend exactly {} tracks, and {}",
        INSTRUCTIONS_INTRO, RECOMMENDATION_COUNT, INSTRUCTIONS_BODY
    );
}

/// Renders the instruction prompt. The output depends only on the inputs.
pub fn build_prompt(context: Option<&UserMusicContext>, mood_context: Option<&str>) -> String {
    let mut prompt = INSTRUCTIONS.clone();

    if let Some(context) = context {
        let recent: Vec<String> = context
            .recent_tracks
            .iter()
            .map(|t| format!("- {} by {}", t.name, t.artist_names()))
            .collect();
        let artists: Vec<String> = context
            .top_artists
            .iter()
            .map(|a| format!("- {} ({})", a.name, a.genres.join(", ")))
            .collect();
        let tracks: Vec<String> = context
            .top_tracks
            .iter()
            .map(|t| format!("- {} by {}", t.name, t.artist_names()))
            .collect();

        prompt.push_str("\n\n## User listening history\n");
        prompt.push_str("### Recently played tracks (latest 10):\n");
        prompt.push_str(&recent.join("\n"));
        prompt.push_str("\n\n### Favorite artists:\n");
        prompt.push_str(&artists.join("\n"));
        prompt.push_str("\n\n### Frequently played tracks:\n");
        prompt.push_str(&tracks.join("\n"));
    }

    if let Some(mood) = mood_context.filter(|m| !m.trim().is_empty()) {
        prompt.push_str("\n\n## User's current situation/mood:\n");
        prompt.push_str(mood);
    }

    prompt
}
