//! GraphQL documents for issues and pull requests.
//!
//! Pull request queries share one connection fragment whose optional parts are selected
//! by a `FieldSet`.

/// Optional pull request fields to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet {
    /// PR author and individual review events, needed for review latency.
    pub reviews: bool,
    /// Latest commit dates and status contexts, needed for CI durations.
    pub ci: bool,
}

impl FieldSet {
    pub const REVIEWS: FieldSet = FieldSet {
        reviews: true,
        ci: false,
    };
    pub const FULL: FieldSet = FieldSet {
        reviews: true,
        ci: true,
    };
}

const REVIEW_DETAIL_FIELDS: &str = "
                author {
                    login
                }
                reviews(first: $pageSize) {
                    totalCount
                    nodes {
                        createdAt
                        author {
                            login
                        }
                    }
                }";

const REVIEW_COUNT_FIELDS: &str = "
                reviews(first: 1) {
                    totalCount
                }";

const CI_FIELDS: &str = "
                commits(last: 1) {
                    nodes {
                        commit {
                            committedDate
                            pushedDate
                            status {
                                contexts {
                                    context
                                    createdAt
                                    targetUrl
                                }
                            }
                        }
                    }
                }";

/// The `prFields` fragment for the given field set.
pub fn pull_request_fragment(fields: FieldSet) -> String {
    let reviews = if fields.reviews {
        REVIEW_DETAIL_FIELDS
    } else {
        REVIEW_COUNT_FIELDS
    };
    let ci = if fields.ci { CI_FIELDS } else { "" };
    format!(
        "
        fragment prFields on PullRequestConnection {{
            nodes {{
                number
                title
                url
                state
                createdAt
                closedAt
                merged
                isCrossRepository{reviews}{ci}
            }}
            pageInfo {{
                endCursor
                hasNextPage
            }}
        }}
"
    )
}

pub const DEFAULT_BRANCH_QUERY: &str = "
    query ($owner: String!, $name: String!) {
        repository(owner: $owner, name: $name) {
            defaultBranchRef {
                name
            }
        }
    }
";

pub const REPO_ISSUES_QUERY: &str = "
    query ($owner: String!, $name: String!, $pageSize: Int!, $after: String) {
        repository(owner: $owner, name: $name) {
            issues(first: $pageSize, after: $after, orderBy: {field: CREATED_AT, direction: DESC}) {
                nodes {
                    number
                    title
                    url
                    state
                    createdAt
                    closedAt
                }
                pageInfo {
                    endCursor
                    hasNextPage
                }
            }
        }
    }
";

pub fn repo_pull_requests_query(fields: FieldSet) -> String {
    let query = "
    query ($owner: String!, $name: String!, $pageSize: Int!, $after: String, $baseRefName: String) {
        repository(owner: $owner, name: $name) {
            pullRequests(first: $pageSize, after: $after, orderBy: {field: CREATED_AT, direction: DESC}, baseRefName: $baseRefName) {
                ...prFields
            }
        }
    }
";
    format!("{query}{}", pull_request_fragment(fields))
}

pub fn user_pull_requests_query(fields: FieldSet) -> String {
    let query = "
    query ($user: String!, $pageSize: Int!, $after: String) {
        user(login: $user) {
            pullRequests(first: $pageSize, after: $after, orderBy: {field: CREATED_AT, direction: DESC}) {
                ...prFields
            }
        }
    }
";
    format!("{query}{}", pull_request_fragment(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_fragment_omits_optional_fields() {
        let fragment = pull_request_fragment(FieldSet {
            reviews: false,
            ci: false,
        });
        assert!(fragment.contains("isCrossRepository"));
        assert!(fragment.contains("totalCount"));
        assert!(!fragment.contains("author"));
        assert!(!fragment.contains("commits(last: 1)"));
    }

    #[test]
    fn test_full_fragment_includes_reviews_and_ci() {
        let fragment = pull_request_fragment(FieldSet::FULL);
        assert!(fragment.contains("reviews(first: $pageSize)"));
        assert!(fragment.contains("login"));
        assert!(fragment.contains("pushedDate"));
        assert!(fragment.contains("targetUrl"));
    }

    #[test]
    fn test_queries_use_the_fragment() {
        let repo = repo_pull_requests_query(FieldSet::REVIEWS);
        assert!(repo.contains("...prFields"));
        assert!(repo.contains("fragment prFields"));
        assert!(repo.contains("baseRefName: $baseRefName"));
        assert!(!repo.contains("commits(last: 1)"));

        let user = user_pull_requests_query(FieldSet::REVIEWS);
        assert!(user.contains("user(login: $user)"));
        assert!(user.contains("CREATED_AT, direction: DESC"));
    }
}
