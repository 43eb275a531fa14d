use url::Url;

/// Normalizes a URL for identity comparison.
///
/// Lowercases the scheme and host, drops the fragment, gives an empty path a `/`, and assumes
/// `https` when no scheme is present. Blank input yields an empty string. The result is a fixed
/// point: normalizing it again returns the same string.
pub fn normalize_url(raw: &str) -> String {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return String::new();
	}

	let candidate = if has_scheme(trimmed) {
		trimmed.to_string()
	} else {
		format!("https://{}", trimmed.trim_start_matches('/'))
	};

	match Url::parse(&candidate) {
		Ok(mut url) => {
			url.set_fragment(None);

			// Only special schemes get their host lowercased by the parser.
			let host = url.host_str().map(str::to_ascii_lowercase);

			if host.as_deref() != url.host_str()
				&& let Err(err) = url.set_host(host.as_deref())
			{
				tracing::debug!(error = %err, url = trimmed, "Host could not be lowercased.");
			}

			url.to_string()
		},
		Err(err) => {
			tracing::debug!(error = %err, url = trimmed, "URL did not parse; using a lenient form.");

			lenient_normalize(&candidate)
		},
	}
}

/// Stable digest of the normalized URL.
pub fn url_hash(raw: &str) -> String {
	blake3::hash(normalize_url(raw).as_bytes()).to_hex().to_string()
}

fn has_scheme(value: &str) -> bool {
	let Some((scheme, _)) = value.split_once("://") else {
		return false;
	};
	let mut chars = scheme.chars();

	chars.next().is_some_and(|first| first.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn lenient_normalize(value: &str) -> String {
	let without_fragment = value.split_once('#').map_or(value, |(head, _)| head);
	let Some((scheme, rest)) = without_fragment.split_once("://") else {
		return without_fragment.to_string();
	};
	let (authority, path) = match rest.find('/') {
		Some(idx) => rest.split_at(idx),
		None => (rest, "/"),
	};

	format!("{}://{}{}", scheme.to_ascii_lowercase(), authority.to_ascii_lowercase(), path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lowercases_host_of_non_special_schemes() {
		assert_eq!(normalize_url("custom://Host.Example/Path"), "custom://host.example/Path");
		assert_eq!(normalize_url("ftp://FTP.Example.com/X"), "ftp://ftp.example.com/X");
	}

	#[test]
	fn lowercases_scheme_and_host_only() {
		assert_eq!(
			normalize_url("HTTP://Example.COM/Path?Q=1#section"),
			"http://example.com/Path?Q=1"
		);
	}

	#[test]
	fn adds_scheme_and_root_path() {
		assert_eq!(normalize_url("example.com"), "https://example.com/");
		assert_eq!(normalize_url("  example.com/a/b  "), "https://example.com/a/b");
	}

	#[test]
	fn blank_input_is_empty() {
		assert_eq!(normalize_url("   "), "");
	}

	#[test]
	fn normalization_is_idempotent() {
		for raw in [
			"HTTPS://Example.com",
			"example.org/x#y",
			"http://a.test:8080/p?q=1",
			"https://b.test/%7Euser/",
		] {
			let once = normalize_url(raw);

			assert_eq!(normalize_url(&once), once, "input: {raw}");
		}
	}

	#[test]
	fn hash_ignores_cosmetic_differences() {
		assert_eq!(url_hash("https://Example.com"), url_hash("https://example.com/#top"));
	}
}
