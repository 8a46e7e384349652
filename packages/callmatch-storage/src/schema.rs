pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_calls.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_calls.sql")),
				"tables/002_pending_recordings.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_pending_recordings.sql")),
				"tables/003_unmatched_recordings.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_unmatched_recordings.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_include_is_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS calls"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS pending_recordings"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS unmatched_recordings"));
	}

	#[test]
	fn statements_split_cleanly_on_semicolons() {
		let statements = render_schema()
			.split(';')
			.map(str::trim)
			.filter(|statement| !statement.is_empty())
			.count();

		assert_eq!(statements, 12);
	}
}
