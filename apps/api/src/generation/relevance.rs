//! Relevance Scoring — deterministic match of CV content against job requirements.
//!
//! Pure text matching, no LLM call: the same inputs always produce the same
//! `RelevanceScore`, down to the order of the item lists.
//!
//! Weights: skills 40, responsibilities 40, keyword coverage 20.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::generation::jd_parser::JobRequirements;
use crate::generation::text::{extract_words, is_generic_item, normalize_text, strip_html};
use crate::models::resume::ResumeContent;

pub const SKILLS_WEIGHT: u32 = 40;
pub const RESPONSIBILITIES_WEIGHT: u32 = 40;
pub const KEYWORDS_WEIGHT: u32 = 20;

/// Minimum word overlap (0–1) for a fuzzy match.
const FUZZY_MATCH_THRESHOLD: f64 = 0.6;
/// Keywords shorter than this are ignored.
const MIN_KEYWORD_LENGTH: usize = 3;
const KEYWORD_MATCH_SOURCE: &str = "Various";

const STRONG_MATCH_MIN: u32 = 70;
const MODERATE_MATCH_MIN: u32 = 40;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Skill,
    Responsibility,
    Keyword,
}

/// One requirement atom and, when matched, the CV section it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringItem {
    pub item: String,
    pub category: ItemCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_in: Option<String>,
}

impl ScoringItem {
    fn matched(item: &str, category: ItemCategory, source: &str) -> Self {
        Self {
            item: item.to_string(),
            category,
            matched_in: Some(source.to_string()),
        }
    }

    fn unmatched(item: &str, category: ItemCategory) -> Self {
        Self {
            item: item.to_string(),
            category,
            matched_in: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 0–40
    pub skills_score: u32,
    /// 0–40
    pub responsibilities_score: u32,
    /// 0–20
    pub keyword_score: u32,
}

/// Result of scoring. `score` always equals the breakdown sum, within 0–100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub score: u32,
    pub breakdown: ScoreBreakdown,
    pub matched_items: Vec<ScoringItem>,
    pub missing_items: Vec<ScoringItem>,
    /// Soft-skill items credited as matched without evidence.
    pub generic_items: Vec<ScoringItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    Strong,
    Moderate,
    Weak,
}

// ────────────────────────────────────────────────────────────────────────────
// CV flattening
// ────────────────────────────────────────────────────────────────────────────

/// A searchable piece of CV text labeled with where it came from.
#[derive(Debug, Clone)]
struct CvSection {
    text: String,
    source: &'static str,
}

fn push_section(sections: &mut Vec<CvSection>, text: Option<&str>, source: &'static str) {
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        sections.push(CvSection {
            text: text.to_string(),
            source,
        });
    }
}

fn push_html_section(sections: &mut Vec<CvSection>, html: Option<&str>, source: &'static str) {
    if let Some(html) = html.filter(|t| !t.is_empty()) {
        sections.push(CvSection {
            text: strip_html(html),
            source,
        });
    }
}

fn extract_cv_sections(cv: &ResumeContent) -> Vec<CvSection> {
    let mut sections = Vec::new();

    push_section(&mut sections, cv.summary.as_deref(), "Summary");
    push_section(&mut sections, cv.contact.name.as_deref(), "Contact");

    for exp in &cv.experience {
        push_section(&mut sections, exp.position.as_deref(), "Experience (Position)");
        push_html_section(&mut sections, exp.description.as_deref(), "Experience (Description)");
        for achievement in &exp.achievements {
            push_section(&mut sections, Some(achievement), "Experience (Achievement)");
        }
    }

    for edu in &cv.education {
        push_section(&mut sections, edu.degree.as_deref(), "Education (Degree)");
        push_section(&mut sections, edu.field.as_deref(), "Education (Field)");
        push_html_section(&mut sections, edu.description.as_deref(), "Education (Description)");
    }

    for category in &cv.skills {
        push_section(&mut sections, category.category.as_deref(), "Skills (Category)");
        push_html_section(&mut sections, category.skills_html.as_deref(), "Skills");
        for item in &category.items {
            push_section(&mut sections, Some(item), "Skills");
        }
    }

    for project in &cv.projects {
        push_section(&mut sections, project.name.as_deref(), "Projects (Name)");
        push_html_section(&mut sections, project.description.as_deref(), "Projects (Description)");
        for tech in &project.technologies {
            push_section(&mut sections, Some(tech), "Projects (Technology)");
        }
    }

    for cert in &cv.certifications {
        push_section(&mut sections, cert.name.as_deref(), "Certifications");
        push_section(&mut sections, cert.issuer.as_deref(), "Certifications (Issuer)");
    }

    sections
}

/// Normalized, non-empty text of the summary, experience, skills and education.
pub fn extract_cv_text_content(cv: &ResumeContent) -> Vec<String> {
    let mut raw: Vec<String> = Vec::new();

    raw.extend(cv.summary.clone());
    for exp in &cv.experience {
        raw.extend(exp.position.clone());
        raw.extend(exp.description.as_deref().map(strip_html));
        raw.extend(exp.achievements.iter().cloned());
    }
    for category in &cv.skills {
        raw.extend(category.category.clone());
        raw.extend(category.skills_html.as_deref().map(strip_html));
        raw.extend(category.items.iter().cloned());
    }
    for edu in &cv.education {
        raw.extend(edu.degree.clone());
        raw.extend(edu.field.clone());
        raw.extend(edu.description.as_deref().map(strip_html));
    }

    raw.iter()
        .map(|text| normalize_text(text))
        .filter(|text| !text.is_empty())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Matching
// ────────────────────────────────────────────────────────────────────────────

/// Overlap of the two word sets relative to the smaller set.
fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a: HashSet<String> = extract_words(a).into_iter().collect();
    let words_b: HashSet<String> = extract_words(b).into_iter().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / words_a.len().min(words_b.len()) as f64
}

/// Finds the first CV section containing `requirement`, returning its source label.
///
/// Per section: substring match, then word overlap, then per-word containment.
fn find_match_in_cv(requirement: &str, sections: &[CvSection]) -> Option<&'static str> {
    let normalized_requirement = normalize_text(requirement);
    let requirement_words = extract_words(requirement);

    for section in sections {
        if normalize_text(&section.text).contains(&normalized_requirement) {
            return Some(section.source);
        }

        if word_overlap(requirement, &section.text) >= FUZZY_MATCH_THRESHOLD {
            return Some(section.source);
        }

        if !requirement_words.is_empty() {
            let section_words: HashSet<String> = extract_words(&section.text).into_iter().collect();
            let present = requirement_words
                .iter()
                .filter(|word| section_words.contains(*word))
                .count();
            if present as f64 / requirement_words.len() as f64 >= FUZZY_MATCH_THRESHOLD {
                return Some(section.source);
            }
        }
    }

    None
}

/// Unique content words (length ≥ 3) across all four requirement lists, sorted.
fn extract_keywords(requirements: &JobRequirements) -> Vec<String> {
    let all_text = requirements
        .skills
        .iter()
        .chain(&requirements.responsibilities)
        .chain(&requirements.qualifications)
        .chain(&requirements.nice_to_haves)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    extract_words(&all_text)
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|word| word.chars().count() >= MIN_KEYWORD_LENGTH)
        .collect()
}

fn weighted(matched: usize, total: usize, weight: u32) -> u32 {
    if total == 0 {
        return weight;
    }
    (matched as f64 / total as f64 * weight as f64).round() as u32
}

/// Scores one requirement category, appending to the item lists.
/// Returns the number of credited (matched or generic) items.
fn score_category(
    items: &[String],
    category: ItemCategory,
    sections: &[CvSection],
    result: &mut RelevanceScore,
) -> usize {
    let mut credited = 0;
    for item in items {
        if is_generic_item(item) {
            result.generic_items.push(ScoringItem::unmatched(item, category));
            credited += 1;
            continue;
        }

        match find_match_in_cv(item, sections) {
            Some(source) => {
                credited += 1;
                result
                    .matched_items
                    .push(ScoringItem::matched(item, category, source));
            }
            None => result.missing_items.push(ScoringItem::unmatched(item, category)),
        }
    }
    credited
}

/// Scores `cv` against `requirements` on a 0–100 scale.
pub fn calculate_relevance_score(
    cv: &ResumeContent,
    requirements: &JobRequirements,
) -> RelevanceScore {
    let sections = extract_cv_sections(cv);

    let mut result = RelevanceScore {
        score: 0,
        breakdown: ScoreBreakdown {
            skills_score: 0,
            responsibilities_score: 0,
            keyword_score: 0,
        },
        matched_items: Vec::new(),
        missing_items: Vec::new(),
        generic_items: Vec::new(),
    };

    let skills_matched = score_category(
        &requirements.skills,
        ItemCategory::Skill,
        &sections,
        &mut result,
    );
    let skills_score = weighted(skills_matched, requirements.skills.len(), SKILLS_WEIGHT);

    let responsibilities_matched = score_category(
        &requirements.responsibilities,
        ItemCategory::Responsibility,
        &sections,
        &mut result,
    );
    let responsibilities_score = weighted(
        responsibilities_matched,
        requirements.responsibilities.len(),
        RESPONSIBILITIES_WEIGHT,
    );

    let keywords = extract_keywords(requirements);
    let all_cv_text = sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let cv_words: HashSet<String> = extract_words(&all_cv_text).into_iter().collect();

    let mut keywords_matched = 0;
    for keyword in &keywords {
        if !cv_words.contains(keyword) {
            continue;
        }
        keywords_matched += 1;
        // Skip keywords already represented by a matched skill or responsibility.
        let already_counted = result
            .matched_items
            .iter()
            .any(|m| normalize_text(&m.item).contains(keyword.as_str()));
        if !already_counted {
            result.matched_items.push(ScoringItem::matched(
                keyword,
                ItemCategory::Keyword,
                KEYWORD_MATCH_SOURCE,
            ));
        }
    }
    let keyword_score = weighted(keywords_matched, keywords.len(), KEYWORDS_WEIGHT);

    result.breakdown = ScoreBreakdown {
        skills_score: skills_score.min(SKILLS_WEIGHT),
        responsibilities_score: responsibilities_score.min(RESPONSIBILITIES_WEIGHT),
        keyword_score: keyword_score.min(KEYWORDS_WEIGHT),
    };
    result.score = (result.breakdown.skills_score
        + result.breakdown.responsibilities_score
        + result.breakdown.keyword_score)
        .min(100);

    result
}

/// Score only, without item detail.
pub fn calculate_quick_score(cv: &ResumeContent, requirements: &JobRequirements) -> u32 {
    calculate_relevance_score(cv, requirements).score
}

/// `strong` (≥70), `moderate` (≥40) or `weak`.
pub fn get_match_strength(score: u32) -> MatchStrength {
    if score >= STRONG_MATCH_MIN {
        MatchStrength::Strong
    } else if score >= MODERATE_MATCH_MIN {
        MatchStrength::Moderate
    } else {
        MatchStrength::Weak
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{
        ResumeCertification, ResumeExperience, ResumeProject, ResumeSkillCategory,
    };

    fn cv_with_summary(summary: &str) -> ResumeContent {
        ResumeContent {
            summary: Some(summary.to_string()),
            ..Default::default()
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn rich_cv() -> ResumeContent {
        ResumeContent {
            summary: Some("Backend engineer focused on payments infrastructure".to_string()),
            experience: vec![ResumeExperience {
                company: Some("Acme".to_string()),
                position: Some("Senior Software Engineer".to_string()),
                description: Some(
                    "<p>Designed <b>event-driven</b> services processing card payments</p>"
                        .to_string(),
                ),
                achievements: strings(&["Mentored junior engineers", "Reduced p99 latency by 40%"]),
            }],
            skills: vec![ResumeSkillCategory {
                category: Some("Languages".to_string()),
                items: strings(&["Rust", "Go", "PostgreSQL"]),
                skills_html: None,
            }],
            projects: vec![ResumeProject {
                name: Some("ledger-sync".to_string()),
                description: None,
                technologies: strings(&["Kafka"]),
            }],
            certifications: vec![ResumeCertification {
                name: Some("Certified Kubernetes Administrator".to_string()),
                issuer: Some("CNCF".to_string()),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_typescript_react_example() {
        let cv = cv_with_summary("Senior TypeScript engineer with React experience");
        let requirements = JobRequirements {
            skills: strings(&["TypeScript", "React", "Node.js"]),
            ..Default::default()
        };

        let result = calculate_relevance_score(&cv, &requirements);

        let matched_skills: Vec<&str> = result
            .matched_items
            .iter()
            .filter(|i| i.category == ItemCategory::Skill)
            .map(|i| i.item.as_str())
            .collect();
        assert_eq!(matched_skills, vec!["TypeScript", "React"]);
        assert_eq!(result.missing_items.len(), 1);
        assert_eq!(result.missing_items[0].item, "Node.js");
        assert_eq!(result.breakdown.skills_score, 27);
        assert_eq!(result.matched_items[0].matched_in.as_deref(), Some("Summary"));
    }

    #[test]
    fn test_empty_skills_scores_full_weight() {
        let requirements = JobRequirements {
            responsibilities: strings(&["Operate Kubernetes clusters"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&ResumeContent::default(), &requirements);
        assert_eq!(result.breakdown.skills_score, SKILLS_WEIGHT);
        assert_eq!(result.breakdown.responsibilities_score, 0);
    }

    #[test]
    fn test_empty_requirements_score_100() {
        let result =
            calculate_relevance_score(&ResumeContent::default(), &JobRequirements::default());
        assert_eq!(result.score, 100);
        assert!(result.matched_items.is_empty());
    }

    #[test]
    fn test_score_equals_breakdown_sum() {
        let requirements = JobRequirements {
            skills: strings(&["Rust", "Haskell", "Kafka"]),
            responsibilities: strings(&["Mentor junior engineers", "Run the sales team"]),
            qualifications: strings(&["Kubernetes certification"]),
            nice_to_haves: strings(&["Fintech background"]),
        };
        let result = calculate_relevance_score(&rich_cv(), &requirements);
        let b = result.breakdown;
        assert_eq!(
            result.score,
            b.skills_score + b.responsibilities_score + b.keyword_score
        );
        assert!(result.score <= 100);
        assert!(b.skills_score <= 40 && b.responsibilities_score <= 40 && b.keyword_score <= 20);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let requirements = JobRequirements {
            skills: strings(&["Rust", "Go", "Terraform", "teamwork"]),
            responsibilities: strings(&["Design event-driven services", "Own incident response"]),
            qualifications: strings(&["5+ years backend experience"]),
            nice_to_haves: strings(&["Kafka", "Kubernetes"]),
        };
        let first = calculate_relevance_score(&rich_cv(), &requirements);
        let second = calculate_relevance_score(&rich_cv(), &requirements);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_generic_responsibility_is_matched_not_missing() {
        let requirements = JobRequirements {
            responsibilities: strings(&["teamwork"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&ResumeContent::default(), &requirements);
        assert_eq!(result.generic_items.len(), 1);
        assert_eq!(result.generic_items[0].item, "teamwork");
        assert_eq!(result.generic_items[0].category, ItemCategory::Responsibility);
        assert!(result.missing_items.is_empty());
        assert_eq!(result.breakdown.responsibilities_score, RESPONSIBILITIES_WEIGHT);
    }

    #[test]
    fn test_html_description_is_stripped_before_matching() {
        let requirements = JobRequirements {
            responsibilities: strings(&["event-driven services"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&rich_cv(), &requirements);
        assert_eq!(
            result.matched_items[0].matched_in.as_deref(),
            Some("Experience (Description)")
        );
    }

    #[test]
    fn test_word_overlap_matches_reordered_phrase() {
        let requirements = JobRequirements {
            responsibilities: strings(&["Engineers mentoring for junior staff"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&rich_cv(), &requirements);
        assert_eq!(result.missing_items.len(), 0, "{:?}", result.missing_items);
        assert_eq!(
            result.matched_items[0].matched_in.as_deref(),
            Some("Experience (Achievement)")
        );
    }

    #[test]
    fn test_word_containment_matches_when_overlap_falls_short() {
        let cv = ResumeContent {
            skills: vec![ResumeSkillCategory {
                category: None,
                items: strings(&["rust tooling platform"]),
                skills_html: None,
            }],
            ..Default::default()
        };
        // Repeated words: the set overlap is 1/2 but 2 of 3 words are present.
        assert!(word_overlap("rust rust go", "rust tooling platform") < FUZZY_MATCH_THRESHOLD);

        let requirements = JobRequirements {
            skills: strings(&["rust rust go", "rust go kafka"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&cv, &requirements);

        assert_eq!(result.matched_items[0].item, "rust rust go");
        assert_eq!(result.matched_items[0].matched_in.as_deref(), Some("Skills"));
        assert_eq!(result.missing_items.len(), 1);
        assert_eq!(result.missing_items[0].item, "rust go kafka");
        assert_eq!(result.breakdown.skills_score, 20);
    }

    #[test]
    fn test_unrelated_requirement_is_missing() {
        let requirements = JobRequirements {
            skills: strings(&["Salesforce administration"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&rich_cv(), &requirements);
        assert_eq!(result.missing_items.len(), 1);
        assert_eq!(result.breakdown.skills_score, 0);
    }

    #[test]
    fn test_keywords_not_double_counted() {
        let cv = cv_with_summary("Rust and Kafka");
        let requirements = JobRequirements {
            skills: strings(&["Rust"]),
            nice_to_haves: strings(&["Kafka streams"]),
            ..Default::default()
        };
        let result = calculate_relevance_score(&cv, &requirements);

        let keywords: Vec<&str> = result
            .matched_items
            .iter()
            .filter(|i| i.category == ItemCategory::Keyword)
            .map(|i| i.item.as_str())
            .collect();
        // "rust" is covered by the matched skill; "kafka" is new; "streams" is absent.
        assert_eq!(keywords, vec!["kafka"]);
        // 2 of 3 keywords present → round(2/3 × 20) = 13
        assert_eq!(result.breakdown.keyword_score, 13);
        assert_eq!(result.breakdown.skills_score, 40);
    }

    #[test]
    fn test_short_keywords_are_ignored() {
        let requirements = JobRequirements {
            skills: strings(&["Go"]),
            ..Default::default()
        };
        assert!(extract_keywords(&requirements).is_empty());
        let result = calculate_relevance_score(&ResumeContent::default(), &requirements);
        assert_eq!(result.breakdown.keyword_score, KEYWORDS_WEIGHT);
    }

    #[test]
    fn test_extract_keywords_sorted_and_unique() {
        let requirements = JobRequirements {
            skills: strings(&["Rust", "Kafka"]),
            responsibilities: strings(&["Write Rust services"]),
            ..Default::default()
        };
        assert_eq!(
            extract_keywords(&requirements),
            strings(&["kafka", "rust", "services", "write"])
        );
    }

    #[test]
    fn test_quick_score_matches_full_score() {
        let requirements = JobRequirements {
            skills: strings(&["Rust", "Elixir"]),
            ..Default::default()
        };
        assert_eq!(
            calculate_quick_score(&rich_cv(), &requirements),
            calculate_relevance_score(&rich_cv(), &requirements).score
        );
    }

    #[test]
    fn test_match_strength_tiers() {
        assert_eq!(get_match_strength(100), MatchStrength::Strong);
        assert_eq!(get_match_strength(70), MatchStrength::Strong);
        assert_eq!(get_match_strength(69), MatchStrength::Moderate);
        assert_eq!(get_match_strength(40), MatchStrength::Moderate);
        assert_eq!(get_match_strength(39), MatchStrength::Weak);
        assert_eq!(get_match_strength(0), MatchStrength::Weak);
    }

    #[test]
    fn test_extract_cv_text_content_normalizes_and_skips_projects() {
        let texts = extract_cv_text_content(&rich_cv());
        assert_eq!(texts[0], "backend engineer focused on payments infrastructure");
        assert!(texts.contains(&"designed event-driven services processing card payments".to_string()));
        assert!(texts.contains(&"postgresql".to_string()));
        assert!(!texts.iter().any(|t| t.contains("ledger")));
    }
}
