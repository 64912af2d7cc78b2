//! Option builder: clients and projects → ticket field options.
//!
//! Everything here is pure. Equal input always yields equal output, which is
//! what makes repeated syncs idempotent on the target side.

use std::collections::HashMap;

use tracing::warn;

use fieldsync_shared::{Client, FieldKind, FieldOption, Project};

/// Separator between client and project name in project option labels.
const PROJECT_LABEL_SEPARATOR: &str = "::";

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Build the option value for a record: `"<kind> <id> <name>"` transliterated
/// to ASCII and lowercased, every run of non `[a-z0-9]` characters collapsed
/// to one hyphen, and hyphens trimmed from both ends.
///
/// `slug("client", 42, "Acme Corp") == "client-42-acme-corp"`
/// `slug("client", 5, "Café Zürich") == "client-5-cafe-zurich"`
pub fn slug(kind: &str, id: u64, name: &str) -> String {
    ::slug::slugify(format!("{kind} {id} {name}"))
}

// ---------------------------------------------------------------------------
// Client options
// ---------------------------------------------------------------------------

/// One option per client, sorted by name, followed by the catch-all default.
pub fn build_client_options(clients: &[Client]) -> Vec<FieldOption> {
    let options = clients
        .iter()
        .map(|client| {
            FieldOption::new(
                client.name.clone(),
                slug(FieldKind::Client.as_str(), client.id, &client.name),
            )
        })
        .collect();

    finish(options, FieldKind::Client)
}

// ---------------------------------------------------------------------------
// Project options
// ---------------------------------------------------------------------------

/// A project whose `client_id` matched none of the fetched clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("project {project_id} ({project_name}) references client {client_id}, which was not found")]
pub struct UnresolvedClient {
    pub project_id: u64,
    pub project_name: String,
    pub client_id: u64,
}

/// Project options plus the projects left out of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOptions {
    pub options: Vec<FieldOption>,
    pub unresolved: Vec<UnresolvedClient>,
}

/// One option per project labelled `"<client>::<project>"`, sorted by label,
/// followed by the catch-all default.
///
/// Projects whose client is missing are logged, recorded in
/// [`ProjectOptions::unresolved`], and excluded. If several clients share an
/// id, the first one in `clients` is used.
pub fn build_project_options(projects: &[Project], clients: &[Client]) -> ProjectOptions {
    let mut by_id: HashMap<u64, &Client> = HashMap::with_capacity(clients.len());
    for client in clients {
        by_id.entry(client.id).or_insert(client);
    }

    let mut options = Vec::with_capacity(projects.len() + 1);
    let mut unresolved = Vec::new();

    for project in projects {
        let Some(client) = by_id.get(&project.client_id) else {
            warn!(
                project_id = project.id,
                client_id = project.client_id,
                "client not found, project left out of options"
            );
            unresolved.push(UnresolvedClient {
                project_id: project.id,
                project_name: project.name.clone(),
                client_id: project.client_id,
            });
            continue;
        };

        options.push(FieldOption::new(
            format!("{}{PROJECT_LABEL_SEPARATOR}{}", client.name, project.name),
            slug(FieldKind::Project.as_str(), project.id, &project.name),
        ));
    }

    ProjectOptions {
        options: finish(options, FieldKind::Project),
        unresolved,
    }
}

/// Stable sort by name (byte order), then append the kind's default option.
fn finish(mut options: Vec<FieldOption>, kind: FieldKind) -> Vec<FieldOption> {
    options.sort_by(|a, b| a.name.cmp(&b.name));
    options.push(kind.default_option());
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: u64, name: &str) -> Client {
        Client {
            id,
            name: name.into(),
        }
    }

    fn project(id: u64, name: &str, client_id: u64) -> Project {
        Project {
            id,
            name: name.into(),
            client_id,
        }
    }

    // -----------------------------------------------------------------------
    // slug
    // -----------------------------------------------------------------------

    #[test]
    fn slug_basic() {
        assert_eq!(slug("client", 42, "Acme Corp"), "client-42-acme-corp");
    }

    #[test]
    fn slug_collapses_punctuation_and_whitespace() {
        assert_eq!(slug("client", 42, "Acme  Corp!!"), "client-42-acme-corp");
        assert_eq!(slug("project", 7, "  --Mobile App (iOS)-- "), "project-7-mobile-app-ios");
        assert_eq!(slug("project", 3, "R&D / Q4"), "project-3-r-d-q4");
    }

    #[test]
    fn slug_handles_empty_names() {
        assert_eq!(slug("client", 5, ""), "client-5");
        assert_eq!(slug("client", 5, "   "), "client-5");
    }

    #[test]
    fn slug_transliterates_accented_letters() {
        assert_eq!(slug("client", 5, "Café Zürich"), "client-5-cafe-zurich");
        assert_eq!(slug("client", 7, "Müller & Söhne"), "client-7-muller-sohne");
        assert_eq!(slug("project", 9, "Crème Brûlée"), "project-9-creme-brulee");
    }

    #[test]
    fn slug_is_deterministic() {
        let a = slug("project", 1001, "Website Relaunch 2.0");
        let b = slug("project", 1001, "Website Relaunch 2.0");
        assert_eq!(a, b);
        assert_eq!(a, "project-1001-website-relaunch-2-0");
    }

    // -----------------------------------------------------------------------
    // Client options
    // -----------------------------------------------------------------------

    #[test]
    fn client_options_sorted_with_default_last() {
        let clients = vec![client(3, "Zeta"), client(1, "Acme"), client(2, "Midway")];
        let options = build_client_options(&clients);

        let names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Midway", "Zeta", "Other"]);
        assert_eq!(options[0].value, "client-1-acme");
        assert_eq!(options.last(), Some(&FieldKind::Client.default_option()));
    }

    #[test]
    fn default_stays_last_even_when_it_would_sort_earlier() {
        // "Other" sorts before "Zeta" but is still appended last.
        let options = build_client_options(&[client(1, "Zeta")]);
        assert_eq!(options[0].name, "Zeta");
        assert_eq!(options[1], FieldOption::new("Other", "client-other"));
    }

    #[test]
    fn client_sort_is_case_sensitive_ordinal() {
        let clients = vec![client(1, "acme"), client(2, "Beta"), client(3, "Acme")];
        let names: Vec<String> = build_client_options(&clients)
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["Acme", "Beta", "acme", "Other"]);
    }

    #[test]
    fn empty_clients_yield_only_default() {
        assert_eq!(
            build_client_options(&[]),
            vec![FieldOption::new("Other", "client-other")]
        );
    }

    // -----------------------------------------------------------------------
    // Project options
    // -----------------------------------------------------------------------

    #[test]
    fn project_option_example() {
        let built = build_project_options(&[project(1, "Website", 10)], &[client(10, "Acme")]);

        assert_eq!(
            built.options,
            vec![
                FieldOption::new("Acme::Website", "project-1-website"),
                FieldOption::new("Other", "project-other"),
            ]
        );
        assert!(built.unresolved.is_empty());
    }

    #[test]
    fn missing_client_is_skipped_not_fatal() {
        let projects = vec![project(1, "Website", 10), project(2, "Orphan", 99)];
        let built = build_project_options(&projects, &[client(10, "Acme")]);

        assert_eq!(built.options.len(), 2);
        assert_eq!(built.options[0].name, "Acme::Website");
        assert_eq!(built.unresolved.len(), 1);
        assert_eq!(built.unresolved[0].client_id, 99);
        assert!(built.unresolved[0].to_string().contains("99"));
    }

    #[test]
    fn first_matching_client_wins() {
        let clients = vec![client(10, "Acme"), client(10, "Acme Duplicate")];
        let built = build_project_options(&[project(1, "Website", 10)], &clients);
        assert_eq!(built.options[0].name, "Acme::Website");
    }

    #[test]
    fn project_options_sorted_by_label() {
        let projects = vec![
            project(1, "Website", 10),
            project(2, "Mobile App (iOS)", 20),
            project(3, "Brand Refresh", 10),
        ];
        let clients = vec![client(10, "Acme"), client(20, "Globex Corporation")];
        let built = build_project_options(&projects, &clients);

        let pairs: Vec<(&str, &str)> = built
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Acme::Brand Refresh", "project-3-brand-refresh"),
                ("Acme::Website", "project-1-website"),
                ("Globex Corporation::Mobile App (iOS)", "project-2-mobile-app-ios"),
                ("Other", "project-other"),
            ]
        );
    }

    #[test]
    fn project_options_bounded_by_resolvable_projects() {
        let projects = vec![
            project(1, "A", 10),
            project(2, "B", 11),
            project(3, "C", 12),
            project(4, "D", 10),
        ];
        let clients = vec![client(10, "Acme"), client(12, "Initech")];
        let built = build_project_options(&projects, &clients);

        let resolvable = projects
            .iter()
            .filter(|p| clients.iter().any(|c| c.id == p.client_id))
            .count();
        assert!(built.options.len() <= resolvable + 1);
        assert_eq!(built.options.len(), 4);
        assert_eq!(built.options.last(), Some(&FieldKind::Project.default_option()));
    }

    #[test]
    fn equal_names_keep_input_order() {
        let projects = vec![project(2, "Support", 10), project(1, "Support", 10)];
        let built = build_project_options(&projects, &[client(10, "Acme")]);
        assert_eq!(built.options[0].value, "project-2-support");
        assert_eq!(built.options[1].value, "project-1-support");
    }
}
