//! Minimal HTML views.
//!
//! The dashboard is personal; the markup stays small and is built with
//! plain string formatting. Every interpolated value goes through
//! [`escape`] first.

use crate::identity::Profile;
use crate::provider::{Artist, TimeRange, Track};
use axum::response::Html;

/// Escape a value for interpolation into HTML text or attributes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{} - tunedeck</title></head>
<body>
{}
</body>
</html>"#,
        escape(title),
        body
    ))
}

/// Home view for an unauthenticated browser.
pub fn home_signed_out() -> Html<String> {
    layout(
        "Welcome",
        r#"<h1>tunedeck</h1>
<p>See your top tracks and artists.</p>
<p><a href="/login">Log in with your music account</a></p>"#,
    )
}

/// Home view for an authenticated user.
pub fn home_signed_in(profile: &Profile) -> Html<String> {
    let profile_link = match &profile.profile_url {
        Some(url) => format!(
            r#"<p><a href="{}">View profile</a></p>"#,
            escape(url)
        ),
        None => String::new(),
    };

    let body = format!(
        r#"<h1>Hi, {}!</h1>
<img src="{}" alt="avatar" width="150">
{}
<p><a href="/top">Your top tracks and artists</a> · <a href="/logout">Log out</a></p>"#,
        escape(profile.name()),
        escape(profile.avatar()),
        profile_link
    );

    layout("Home", &body)
}

/// Top tracks/artists view.
pub fn top_page(
    user_id: &str,
    time_range: TimeRange,
    tracks: &[Track],
    artists: &[Artist],
) -> Html<String> {
    let mut body = format!(
        r#"<h1>Top items for {}</h1>
<p data-time-range="{}">Time window: {}</p>
<h2>Top tracks</h2>
<ol>"#,
        escape(user_id),
        time_range.as_str(),
        time_range.label()
    );

    for track in tracks {
        let title = match &track.url {
            Some(url) => format!(r#"<a href="{}">{}</a>"#, escape(url), escape(&track.name)),
            None => escape(&track.name),
        };
        let by = if track.artists.is_empty() {
            String::new()
        } else {
            format!(" — {}", escape(&track.artists.join(", ")))
        };
        body.push_str(&format!("\n<li>{}{}</li>", title, by));
    }

    body.push_str("\n</ol>\n<h2>Top artists</h2>\n<ol>");

    for artist in artists {
        let name = match &artist.url {
            Some(url) => format!(r#"<a href="{}">{}</a>"#, escape(url), escape(&artist.name)),
            None => escape(&artist.name),
        };
        body.push_str(&format!("\n<li>{}</li>", name));
    }

    body.push_str(
        "\n</ol>\n<p><a href=\"/\">Home</a> · <a href=\"/logout\">Log out</a></p>",
    );

    layout("Top items", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a&b"), "a&amp;b");
        assert_eq!(escape("<script>"), "&lt;script&gt;");
        assert_eq!(escape(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_home_signed_in_uses_placeholder_avatar() {
        let profile = Profile {
            id: "u42".to_string(),
            display_name: None,
            avatar_url: None,
            profile_url: None,
        };

        let Html(page) = home_signed_in(&profile);
        // Name falls back to the id, avatar to the placeholder
        assert!(page.contains("Hi, u42!"));
        assert!(page.contains("via.placeholder.com"));
        assert!(!page.contains("View profile"));
    }

    #[test]
    fn test_home_signed_in_with_full_profile() {
        let profile = Profile {
            id: "u42".to_string(),
            display_name: Some("Alex".to_string()),
            avatar_url: Some("https://img.example/alex.png".to_string()),
            profile_url: Some("https://music.example/user/u42".to_string()),
        };

        let Html(page) = home_signed_in(&profile);
        assert!(page.contains("Hi, Alex!"));
        assert!(page.contains("https://img.example/alex.png"));
        assert!(page.contains("View profile"));
    }

    #[test]
    fn test_top_page_contents() {
        let tracks = vec![Track {
            name: "Paranoid Android".to_string(),
            artists: vec!["Radiohead".to_string()],
            album: Some("OK Computer".to_string()),
            url: None,
        }];
        let artists = vec![Artist {
            name: "Radiohead".to_string(),
            genres: vec!["art rock".to_string()],
            url: Some("https://music.example/artist/1".to_string()),
        }];

        let Html(page) = top_page("u42", TimeRange::MediumTerm, &tracks, &artists);
        assert!(page.contains(r#"data-time-range="medium_term""#));
        assert!(page.contains("last 6 months"));
        assert!(page.contains("Paranoid Android"));
        assert!(page.contains("Radiohead"));
    }

    #[test]
    fn test_top_page_escapes_names() {
        let tracks = vec![Track {
            name: "<b>Bold</b> & Beautiful".to_string(),
            artists: vec![],
            album: None,
            url: None,
        }];

        let Html(page) = top_page("u42", TimeRange::ShortTerm, &tracks, &[]);
        assert!(page.contains("&lt;b&gt;Bold&lt;/b&gt; &amp; Beautiful"));
        assert!(!page.contains("<b>Bold</b>"));
    }
}
