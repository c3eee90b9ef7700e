use triage_query::{Issue, IssueCollection, IssueSet, TriageConfig};

const CONFIGURATION: &str = r#"{
    "repositories": ["dotnet/runtime", "dotnet/corefx"],
    "untriaged": {
        "area_labels": { "prefixes": ["area-"] },
        "issue_type_labels": { "names": ["bug", "enhancement"] },
        "require_milestone": true
    },
    "custom_leaves": [
        { "name": "actionable", "query": "is:open is:issue -label:blocked" }
    ],
    "queries": [
        { "name": "untriaged", "query": "is:untriaged is:actionable" },
        { "name": "open bugs", "query": "label:bug !(is:closed OR is:pr)" },
        { "name": "networking", "variants": [
            { "repository": "dotnet/runtime", "query": "label:area-System.Net is:open" },
            { "repository": "dotnet/corefx", "query": "label:area-System.Net.Http is:open" }
        ] },
        { "name": "typos", "query": "label:bgu OR milestone:8.0.1" }
    ]
}"#;

const ISSUES: &str = r#"[
    { "number": 1, "repository": "dotnet/runtime", "labels": ["bug", "area-System.Net"], "milestone": "8.0.0" },
    { "number": 2, "repository": "dotnet/runtime", "labels": ["enhancement"] },
    { "number": 3, "repository": "dotnet/runtime", "labels": ["bug", "blocked"] },
    { "number": 4, "repository": "dotnet/corefx", "labels": ["bug", "area-System.Net.Http"], "kind": "pull_request" },
    { "number": 5, "repository": "dotnet/corefx", "labels": ["area-System.Net.Http", "bug"], "state": "closed" }
]"#;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Build the catalog of named queries
    let catalog = TriageConfig::from_json(CONFIGURATION)
        .unwrap()
        .build()
        .unwrap();
    let issues: IssueSet = Issue::from_json_list(ISSUES).unwrap().into_iter().collect();

    for query in catalog.queries() {
        println!("{}: {}", query.name(), query.expression());

        // Warn about the names that no issue uses
        query.expression().validate(&issues);

        // Evaluate the query against every issue
        for issue in query.matches(issues.issues()) {
            println!("  matched {}", issue.html_url());
        }

        // Link to the search page, falling back to one link per repository
        match query.search_query() {
            Some(search) => println!("  search: {}", search.url()),
            None => {
                let normalized = query.expression().normalize();
                for (repository, search) in normalized.search_links(catalog.repositories()) {
                    match search {
                        Some(search) => println!("  {repository}: {}", search.url()),
                        None => println!("  {repository}: cannot be searched"),
                    }
                }
            }
        }
    }
}
