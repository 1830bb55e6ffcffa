//! Human-readable rendering of Hydra responses
//!
//! Every renderer writes line-oriented text to a `Write` sink and ends with
//! a short list of follow-up commands. Fields missing from a response are
//! printed as empty strings rather than failing.

use crate::types::JsonValue;
use chrono::DateTime;
use std::io::{self, Write};

const EXECUTABLE: &str = "hydra-connect";

/// Render a scalar JSON value without quotes
fn text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn field(value: &JsonValue, key: &str) -> String {
    text(value.get(key))
}

/// Render a unix timestamp field as UTC, falling back to the raw value
fn timestamp(value: &JsonValue, key: &str) -> String {
    value
        .get(key)
        .and_then(JsonValue::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || field(value, key),
            |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

fn heading(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(title.len()))
}

fn suggestions(out: &mut dyn Write, hints: &[(&str, &str)]) -> io::Result<()> {
    writeln!(out)?;
    heading(out, "Some suggestions:")?;
    let width = hints.iter().map(|(cmd, _)| cmd.len()).max().unwrap_or(0);
    for (cmd, what) in hints {
        writeln!(out, "{EXECUTABLE} {cmd:<width$}    {what}")?;
    }
    Ok(())
}

fn is_hidden(project: &JsonValue) -> bool {
    match project.get("hidden") {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

/// Project overview: `name | displayname | description`
pub fn projects(out: &mut dyn Write, value: &JsonValue, display_invisible: bool) -> io::Result<()> {
    let projects = value.as_array().map(Vec::as_slice).unwrap_or_default();

    for project in projects {
        if !display_invisible && is_hidden(project) {
            continue;
        }
        writeln!(
            out,
            "{} | {} | {}",
            field(project, "name"),
            field(project, "displayname"),
            field(project, "description")
        )?;
    }

    suggestions(
        out,
        &[
            ("project ID", "Query project properties"),
            ("queue", "Show queue contents"),
            ("status", "Show running jobs in queue"),
        ],
    )
}

pub fn project(out: &mut dyn Write, project_id: &str, value: &JsonValue) -> io::Result<()> {
    heading(out, "Configuration")?;
    writeln!(out, "Project ID: {project_id}")?;
    writeln!(out, "Display name: {}", field(value, "displayname"))?;
    writeln!(out, "Description: {}", field(value, "description"))?;
    writeln!(out, "Homepage: {}", field(value, "homepage"))?;
    writeln!(out, "Owner: {}", field(value, "owner"))?;
    writeln!(out, "Enabled: {}", field(value, "enabled"))?;
    writeln!(out, "Hidden: {}", field(value, "hidden"))?;

    for (key, title) in [("jobsets", "Jobsets"), ("releases", "Releases")] {
        let Some(items) = value.get(key).and_then(JsonValue::as_array) else {
            continue;
        };
        if items.is_empty() {
            continue;
        }
        writeln!(out)?;
        heading(out, title)?;
        for item in items {
            writeln!(out, "{}", text(Some(item)))?;
        }
    }

    suggestions(
        out,
        &[("jobset PROJECT JOBSET", "Query jobset properties")],
    )
}

pub fn jobset(
    out: &mut dyn Write,
    project_id: &str,
    jobset_id: &str,
    value: &JsonValue,
) -> io::Result<()> {
    heading(out, "Configuration")?;
    writeln!(out, "Project ID: {project_id}")?;
    writeln!(out, "Jobset ID: {jobset_id}")?;
    writeln!(out, "Enabled: {}", field(value, "enabled"))?;
    writeln!(
        out,
        "Nix expression: {} in input: {}",
        field(value, "nixexprpath"),
        field(value, "nixexprinput")
    )?;
    writeln!(out, "Email override: {}", field(value, "emailoverride"))?;

    if let Some(inputs) = value.get("jobsetinputs").and_then(JsonValue::as_object) {
        if !inputs.is_empty() {
            writeln!(out)?;
            heading(out, "Inputs")?;
            for (name, input) in inputs {
                let alt = input
                    .get("jobsetinputalts")
                    .and_then(JsonValue::as_array)
                    .and_then(|alts| alts.first());
                writeln!(out, "{name}: {}", text(alt))?;
            }
        }
    }

    writeln!(out)?;
    heading(out, "Evaluation errors")?;
    writeln!(out, "{}", field(value, "errormsg"))?;

    suggestions(
        out,
        &[("evals PROJECT JOBSET", "Query evaluations")],
    )
}

/// One line per evaluation: `id: input -> revision, ...`
pub fn evaluations(out: &mut dyn Write, value: &JsonValue) -> io::Result<()> {
    let evals = value
        .get("evals")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for eval in evals {
        let revisions: Vec<String> = eval
            .get("jobsetevalinputs")
            .and_then(JsonValue::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(name, input)| {
                let revision = input.get("revision").and_then(JsonValue::as_str)?;
                (!revision.is_empty()).then(|| format!("{name} -> {revision}"))
            })
            .collect();

        writeln!(out, "{}: {}", field(eval, "id"), revisions.join(", "))?;
    }

    suggestions(out, &[("eval ID", "Query evaluation properties")])
}

pub fn evaluation(out: &mut dyn Write, value: &JsonValue) -> io::Result<()> {
    writeln!(out, "Evaluation: {}", field(value, "id"))?;
    writeln!(out)?;

    let has_new_builds = matches!(
        value.get("hasnewbuilds"),
        Some(JsonValue::Bool(true))
    ) || value.get("hasnewbuilds").and_then(JsonValue::as_i64) == Some(1);
    if has_new_builds {
        writeln!(out, "This evaluation has new builds")?;
        writeln!(out)?;
    }

    if let Some(builds) = value.get("builds").and_then(JsonValue::as_array) {
        if !builds.is_empty() {
            heading(out, "Builds")?;
            for build in builds {
                writeln!(out, "{}", text(Some(build)))?;
            }
        }
    }

    if let Some(inputs) = value.get("jobsetevalinputs").and_then(JsonValue::as_object) {
        if !inputs.is_empty() {
            writeln!(out)?;
            heading(out, "Inputs")?;
            for (name, input) in inputs {
                let shown = input
                    .get("value")
                    .filter(|v| !v.is_null() && v.as_str() != Some(""))
                    .or_else(|| input.get("uri"));
                writeln!(out, "name: {name}")?;
                writeln!(out, "type: {}", field(input, "type"))?;
                writeln!(out, "value: {}", text(shown))?;
                writeln!(out, "revision: {}", field(input, "revision"))?;
                writeln!(out)?;
            }
        }
    }

    suggestions(out, &[("build ID", "Query build properties")])
}

pub fn build(out: &mut dyn Write, value: &JsonValue) -> io::Result<()> {
    writeln!(out, "Build ID: {}", field(value, "id"))?;
    writeln!(out)?;
    writeln!(out, "Finished: {}", field(value, "finished"))?;
    writeln!(out, "Status: {}", build_status(value))?;
    writeln!(out, "System: {}", field(value, "system"))?;
    writeln!(out, "Nix name: {}", field(value, "nixname"))?;
    writeln!(out, "Part of evaluations: {}", field(value, "jobsetevals"))?;

    let start = value.get("starttime").or_else(|| value.get("timestamp"));
    let duration = start
        .and_then(JsonValue::as_i64)
        .zip(value.get("stoptime").and_then(JsonValue::as_i64))
        .map(|(start, stop)| format!("{}s", stop - start));
    writeln!(out, "Duration: {}", duration.unwrap_or_default())?;
    writeln!(out, "Finished at: {}", timestamp(value, "stoptime"))?;

    if let Some(products) = value.get("buildproducts").and_then(JsonValue::as_object) {
        if !products.is_empty() {
            writeln!(out)?;
            heading(out, "Build products")?;
            for (id, product) in products {
                writeln!(
                    out,
                    "{id}: ({}) {}",
                    field(product, "type"),
                    field(product, "name")
                )?;
            }
        }
    }

    writeln!(out)?;
    heading(out, "Details")?;
    writeln!(out, "Derivation store path: {}", field(value, "drvpath"))?;
    writeln!(out, "Output store paths:")?;
    if let Some(outputs) = value.get("buildoutputs").and_then(JsonValue::as_object) {
        for (name, output) in outputs {
            writeln!(out, "{name} = {}", field(output, "path"))?;
        }
    }

    suggestions(
        out,
        &[
            ("eval ID", "Query evaluation properties"),
            ("raw-log BUILD", "Download raw build log"),
            ("build-product BUILD PRODUCT", "Download build product"),
        ],
    )
}

/// Meaning of Hydra's numeric `buildstatus`
fn build_status(value: &JsonValue) -> String {
    let Some(code) = value.get("buildstatus").and_then(JsonValue::as_i64) else {
        return field(value, "buildstatus");
    };

    let meaning = match code {
        0 => "succeeded",
        1 => "failed",
        2 => "dependency failed",
        3 | 4 => "aborted",
        6 => "failed with output",
        7 => "timed out",
        10 => "log limit exceeded",
        11 => "output limit exceeded",
        _ => return code.to_string(),
    };
    format!("{code} ({meaning})")
}

/// Queue or status: `id | project:jobset:job | time | nixname | system`
pub fn queue(out: &mut dyn Write, value: &JsonValue) -> io::Result<()> {
    let jobs = value.as_array().map(Vec::as_slice).unwrap_or_default();

    for job in jobs {
        writeln!(
            out,
            "{} | {}:{}:{} | {} | {} | {}",
            field(job, "id"),
            field(job, "project"),
            field(job, "jobset"),
            field(job, "job"),
            timestamp(job, "timestamp"),
            field(job, "nixname"),
            field(job, "system")
        )?;
    }

    suggestions(out, &[("build ID", "Query build properties")])
}

/// Any other result: the value itself, or nothing for an empty body
pub fn plain(out: &mut dyn Write, value: &JsonValue) -> io::Result<()> {
    match value {
        JsonValue::Null => Ok(()),
        JsonValue::String(s) if s.trim().is_empty() => Ok(()),
        other => writeln!(out, "{}", text(Some(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_projects_skip_hidden() {
        let value = json!([
            {"name": "foobar", "displayname": "Foobar", "description": "Foo", "hidden": false},
            {"name": "secret", "displayname": "Secret", "description": "Hush", "hidden": true},
        ]);

        let shown = render(|out| projects(out, &value, false));
        assert!(shown.starts_with("foobar | Foobar | Foo\n"));
        assert!(!shown.contains("secret"));
        assert!(shown.contains("Some suggestions:"));

        let all = render(|out| projects(out, &value, true));
        assert!(all.contains("secret | Secret | Hush"));
    }

    #[test]
    fn test_evaluations_line() {
        let value = json!({
            "evals": [{
                "id": 12,
                "jobsetevalinputs": {
                    "nixpkgs": {"revision": "abc123"},
                    "src": {"revision": "def456"},
                    "system": {"value": "x86_64-linux"}
                }
            }]
        });

        let output = render(|out| evaluations(out, &value));
        assert_eq!(
            output.lines().next().unwrap(),
            "12: nixpkgs -> abc123, src -> def456"
        );
    }

    #[test]
    fn test_queue_line_renders_timestamp() {
        let value = json!([{
            "id": 7,
            "project": "nixpkgs",
            "jobset": "trunk",
            "job": "hello",
            "timestamp": 0,
            "nixname": "hello-2.12",
            "system": "x86_64-linux"
        }]);

        let output = render(|out| queue(out, &value));
        assert_eq!(
            output.lines().next().unwrap(),
            "7 | nixpkgs:trunk:hello | 1970-01-01 00:00:00 UTC | hello-2.12 | x86_64-linux"
        );
    }

    #[test]
    fn test_build_summary() {
        let value = json!({
            "id": 42,
            "finished": 1,
            "buildstatus": 2,
            "system": "x86_64-linux",
            "nixname": "hello-2.12",
            "jobsetevals": [12],
            "starttime": 100,
            "stoptime": 160,
            "buildproducts": {"1": {"type": "nix-build", "name": "hello"}},
            "drvpath": "/nix/store/abc-hello.drv",
            "buildoutputs": {"out": {"path": "/nix/store/def-hello"}}
        });

        let output = render(|out| build(out, &value));
        assert!(output.contains("Status: 2 (dependency failed)"));
        assert!(output.contains("Duration: 60s"));
        assert!(output.contains("1: (nix-build) hello"));
        assert!(output.contains("out = /nix/store/def-hello"));
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let output = render(|out| project(out, "foobar", &json!({})));
        assert!(output.contains("Display name: \n"));
        assert!(!output.contains("Jobsets"));
    }

    #[test]
    fn test_plain() {
        assert_eq!(render(|out| plain(out, &JsonValue::Null)), "");
        assert_eq!(render(|out| plain(out, &json!(3))), "3\n");
        assert_eq!(render(|out| plain(out, &json!("done"))), "done\n");
    }
}
