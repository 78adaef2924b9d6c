//! Prompt builders for every pipeline stage.
//!
//! Pure string templates. JSON-mode prompts omit the trailing "return only
//! JSON" instruction; the gateway appends it.

use regex::{Captures, Regex};
use std::fmt::Write as _;
use std::sync::OnceLock;

use crate::domain::models::{Example, RulePotentialScores, SuggestedRule};

/// Maximum NO_MATCH examples shown when generating a single rule.
pub const RULE_CONTEXT_NO_MATCHES: usize = 3;

/// Maximum examples per side shown to the boundary mapper.
pub const BOUNDARY_EXAMPLE_LIMIT: usize = 10;

const SANITIZE_REPLACEMENTS: &[(&str, &str)] = &[
    ("fails", "does not"),
    ("fail", "does not work"),
    ("failed", "did not work"),
    ("failing", "not working"),
    ("error", "situation"),
    ("errors", "situations"),
    ("problem", "scenario"),
    ("problems", "scenarios"),
    ("broken", "not functioning"),
    ("crash", "stop working"),
    ("crashed", "stopped working"),
    ("attack", "test case"),
    ("attacks", "test cases"),
    ("vulnerability", "security consideration"),
    ("vulnerabilities", "security considerations"),
    ("exploit", "use case"),
    ("hack", "modify"),
    ("hacking", "modifying"),
    ("malicious", "unexpected"),
    ("harmful", "unexpected"),
    ("dangerous", "unexpected"),
];

fn sanitize_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = SANITIZE_REPLACEMENTS
            .iter()
            .map(|(word, _)| regex::escape(word))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{alternation})\b")).expect("sanitize pattern is valid")
    })
}

/// Lower-case `text` and swap words that tend to trip content filters for
/// neutral alternatives. Whole words only.
pub fn sanitize_issue_description(text: &str) -> String {
    let lowered = text.to_lowercase();
    sanitize_regex()
        .replace_all(&lowered, |caps: &Captures<'_>| {
            let word = &caps[0];
            SANITIZE_REPLACEMENTS
                .iter()
                .find(|(from, _)| *from == word)
                .map_or_else(|| word.to_string(), |(_, to)| (*to).to_string())
        })
        .into_owned()
}

fn numbered_pairs(examples: &[&Example]) -> String {
    if examples.is_empty() {
        return "None provided".to_string();
    }
    examples
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. User: \"{}\"\n   Assistant: \"{}\"", i + 1, e.user, e.assistant))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn quoted_texts(examples: &[&Example]) -> String {
    if examples.is_empty() {
        return "None provided".to_string();
    }
    examples
        .iter()
        .map(|e| format!("- \"{}\"", e.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn genre_identification(issue: &str) -> String {
    format!(
        r#"You are mapping the different ways a reported assistant quality issue shows up in production.

## Issue
"{issue}"

## Instructions
1. Identify 3-6 distinct genres of this issue. Each genre is a different context, technology or scenario in which the issue appears.
2. Genres must not overlap and together should cover the range of manifestations.
3. For each genre write a self-contained prompt that restates the issue and asks for 1-2 realistic production examples.
4. Across all genres the prompts should yield 10-12 examples.

## Required Output Format (JSON)
{{
  "genres": [
    {{
      "name": "Short genre name, e.g. 'API Documentation Access Failure'",
      "description": "One sentence on this genre",
      "prompt": "Focused, self-contained generation prompt for this genre"
    }}
  ]
}}"#
    )
}

/// Three generic genres used when identification fails.
pub fn fallback_genre_prompts(issue: &str) -> [(&'static str, &'static str, String); 3] {
    [
        (
            "Primary Manifestation",
            "Main way the issue occurs",
            format!(
                "Generate 2-3 realistic production examples of this issue:\n\n\
                 ISSUE: \"{issue}\"\n\n\
                 Write user-assistant interactions that clearly show the issue. \
                 Be specific, name real technologies and keep the scenarios realistic."
            ),
        ),
        (
            "Edge Case Manifestation",
            "Edge cases or boundary scenarios",
            format!(
                "Generate 2-3 realistic production examples of edge cases or boundary scenarios for this issue:\n\n\
                 ISSUE: \"{issue}\"\n\n\
                 Write user-assistant interactions where the issue appears in subtle or unusual ways."
            ),
        ),
        (
            "Different Context Manifestation",
            "Issue occurring in different contexts",
            format!(
                "Generate 2-3 realistic production examples of this issue in different contexts or with different technologies:\n\n\
                 ISSUE: \"{issue}\"\n\n\
                 Vary the setting across the examples."
            ),
        ),
    ]
}

/// Genre prompt plus the example schema every genre must answer with.
pub fn genre_examples(genre_prompt: &str) -> String {
    format!(
        r#"{genre_prompt}

## Required Output Format (JSON)
{{
  "examples": [
    {{
      "user_message": "The user's message",
      "assistant_response": "The assistant's response",
      "has_issue": true,
      "category": "SIMPLE_POSITIVE | SIMPLE_NEGATIVE | BOUNDARY_POSITIVE | BOUNDARY_NEGATIVE",
      "topic": "Brief topic"
    }}
  ]
}}"#
    )
}

pub fn rule_potential(example: &Example, issue: &str) -> String {
    format!(
        r#"Judge how well this single example could seed a precise, generalizable classification rule.

## Issue
"{issue}"

## Example
User: {user}
Assistant: {assistant}

## Criteria
- Clarity: the example plainly shows the issue.
- Generalizability: a rule drawn from it would apply to similar cases.
- Specificity: it has distinguishing features a rule can capture.
- Coverage: such a rule would catch related occurrences.

## Scale (0-100)
- 90-100: excellent, supports a strong general rule
- 70-89: good, some limitations
- 50-69: moderate, the rule would be narrow or leave gaps
- 0-49: poor, too specific or too unclear

## Required Output Format (JSON)
{{"score": 85, "reasoning": "Short justification"}}"#,
        user = example.user,
        assistant = example.assistant,
    )
}

/// `matches` pairs each MATCH example with its index in `labelled`.
pub fn example_selection(
    issue: &str,
    labelled: &[Example],
    matches: &[(usize, &Example)],
    scores: &RulePotentialScores,
) -> String {
    let mut examples_text = String::new();
    for (i, (original, example)) in matches.iter().enumerate() {
        let _ = write!(
            examples_text,
            "\nExample {i} (Original Index {original}):\nUser: {}\nAssistant: {}\n",
            example.user, example.assistant
        );
    }

    let mut scores_text = String::new();
    if !scores.is_empty() {
        scores_text.push_str("\n\n## Rule Potential Scores\n");
        for (idx, potential) in scores.range(..labelled.len()) {
            let _ = writeln!(
                scores_text,
                "Example {idx}: Score {} - {}",
                potential.score, potential.reasoning
            );
        }
    }

    format!(
        r#"Pick the 4 examples with the most potential for strong, generalized classification rules.

## Issue
"{issue}"

## Available Examples{examples_text}{scores_text}

## Selection Criteria
1. The rule each example leads to should have high precision and recall.
2. Prefer examples covering different aspects of the issue.
3. An exceptionally good example may be chosen twice.
4. Favour examples with clear, distinguishable features.
5. Take the rule potential scores into account when present.

## Required Output Format (JSON)
{{
  "selected_examples": [
    {{"example_index": 0, "reason": "Why this example was chosen"}}
  ]
}}

Return exactly 4 selections; indices refer to the "Example N" numbers above."#
    )
}

pub fn rule_for_example(example: &Example, issue: &str, no_matches: &[&Example]) -> String {
    let context = no_matches
        .iter()
        .take(RULE_CONTEXT_NO_MATCHES)
        .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
        .collect::<Vec<_>>()
        .join("\n");
    let example_head: String = example.assistant.chars().take(100).collect();

    format!(
        r#"Write ONE actionable classification rule from the example below.

## Issue
"{issue}"

## Example (MATCH)
User: {user}
Assistant: {assistant}

## NO_MATCH Context (avoid false positives on these)
{context}

## Requirements
1. The rule must classify the example above as MATCH.
2. Use the form "The [output|input] must [condition]" or "The [output|input] must not [condition]".
3. Specific enough to catch this example, general enough for similar cases.
4. Must not fire on the NO_MATCH context.

## Required Output Format (JSON)
{{
  "rule": "The output must express the assistant failing to access documentation",
  "description": "What this rule detects",
  "check_location": "output",
  "condition_type": "must_express",
  "condition": "assistant failing to access documentation",
  "must_contain_keywords": ["can't", "cannot", "unable"],
  "must_contain_phrases": ["can't reach", "cannot access"],
  "example": "{example_head}..."
}}"#,
        user = example.user,
        assistant = example.assistant,
    )
}

/// Single-shot prompt asking for 5-7 rules over the whole labelled set.
pub fn rules_synthesis(issue: &str, matches: &[&Example], no_matches: &[&Example]) -> String {
    format!(
        r#"You are a senior classification engineer. Synthesize 5-7 robust, generalizable rules from the labelled ground truth below. The rules will drive a small, fast classifier over production logs, so favour precision over recall.

## Issue
"{issue}"

Every rule must target this issue.

## MATCH ({match_count} examples, the operator wants these detected)
{matches_text}

## NO_MATCH ({no_match_count} examples, the operator does not want these detected)
{no_matches_text}

## Analysis
1. Pattern extraction: what every MATCH shares, and which features appear only in MATCH.
2. Boundaries: what separates NO_MATCH from MATCH and which keywords should exclude an interaction.
3. Rules: 5-7 conservative rules that together classify every example above correctly.
4. Exclusions: at least two exclusion clauses drawn from NO_MATCH (praise, user error resolved by the assistant, resolved past issues).
5. Coverage and generalization: how each rule behaves on unseen variations.

## Rule Format
- Start with "The output", "The input", "The assistant_message" or "The user_message".
- Continue with "must express|contain|indicate" or "must not be|contain|indicate".
- End with the concrete condition, e.g. "The output must express the assistant failing to access documentation".
- Include an example taken from the labelled data.

## Required Output Format (JSON)
{{
  "pattern_analysis": {{
    "common_features_in_matches": ["..."],
    "distinctive_features_in_no_matches": ["..."],
    "key_distinction": "One sentence",
    "context_analysis": "Where matches appear"
  }},
  "proposed_rules": [
    {{
      "rule_id": 1,
      "type": "must_have|exclusion_clause|context_dependent",
      "rule": "The output must ...",
      "description": "The output must ...",
      "check_location": "output|input|assistant_message|user_message",
      "condition_type": "must_express|must_contain|must_indicate|must_not_be|must_not_contain|must_not_indicate",
      "condition": "Concrete condition",
      "must_contain_keywords": ["..."],
      "must_contain_phrases": ["..."],
      "example": "Text from a labelled example",
      "confidence": 0.85
    }}
  ],
  "exclusion_clauses": [
    {{"clause_id": 1, "description": "...", "pattern": "..."}}
  ],
  "generalization_notes": "..."
}}"#,
        match_count = matches.len(),
        matches_text = numbered_pairs(matches),
        no_match_count = no_matches.len(),
        no_matches_text = numbered_pairs(no_matches),
    )
}

/// One-call generation of `n` labelled interactions at a 60/40 split.
pub fn minimal_safe_examples(issue: &str, n: usize) -> String {
    let positives = (n * 3 + 2) / 5;
    let negatives = n - positives;
    let simple_positive = (positives * 7 + 5) / 10;
    let boundary_positive = positives - simple_positive;
    let simple_negative = (negatives + 1) / 2;
    let boundary_negative = negatives - simple_negative;

    format!(
        r#"You are the dataset designer for an AI quality assurance platform. Produce realistic user-assistant interactions for testing a classifier.

## Issue
"{issue}"

## Task
Generate {n} distinct production interactions. Every MATCH example must show the assistant actually doing what the issue describes, not merely mentioning it.

## Distribution
- MATCH: {positives} examples
  - SIMPLE_POSITIVE ({simple_positive}): obvious, unambiguous occurrences of the issue.
  - BOUNDARY_POSITIVE ({boundary_positive}): real occurrences phrased indirectly, sarcastically or in complex language.
- NO_MATCH: {negatives} examples
  - SIMPLE_NEGATIVE ({simple_negative}): ordinary successful interactions.
  - BOUNDARY_NEGATIVE ({boundary_negative}): share keywords with the issue ("doc", "search", "fail", "error") but are not the issue, such as praise, user mistakes the assistant resolves, or problems that are already fixed.

## Diversity
- Real technologies: Kubernetes, Docker, Python, React, AWS, GitHub Actions, PostgreSQL, Node.js.
- Varied personas and registers, short and long exchanges, occasional typos.

## Required Output Format (JSON)
{{
  "examples": [
    {{
      "id": "1",
      "user_message": "What's the kubectl command to stream logs from a pod?",
      "assistant_response": "Sorry, I was unable to search the Kubernetes documentation right now.",
      "has_issue": true,
      "category": "SIMPLE_POSITIVE",
      "topic": "Kubernetes"
    }}
  ]
}}"#
    )
}

pub fn red_team_cases(rule: &str, positives: &[&Example], negatives: &[&Example]) -> String {
    format!(
        r#"You are writing test cases to probe a classification rule.

## Rule
"{rule}"

## Positive Examples (should match)
{positives}

## Negative Examples (should not match)
{negatives}

Generate 10 test cases that explore different scenarios and the edges of the rule, including near-paraphrases that might be classified differently.

## Required Output Format (JSON)
{{
  "test_cases": [
    {{"text": "Test case text", "should_match": true, "reasoning": "Which boundary this probes"}}
  ]
}}"#,
        positives = quoted_texts(positives),
        negatives = quoted_texts(negatives),
    )
}

/// `cases` pairs each test text with whether it should match.
pub fn red_team_analysis(rule: &str, cases: &[(&str, bool)]) -> String {
    let listed = cases
        .iter()
        .enumerate()
        .map(|(i, (text, should))| format!("{}. \"{text}\" (expected_match: {should})", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Decide whether each test case would match this rule: "{rule}"

## Test Cases
{listed}

## Required Output Format (JSON)
{{
  "results": [
    {{"test_case": "Text", "would_match": true, "should_match": true, "is_problematic": false}}
  ],
  "robustness_score": 0
}}

is_problematic is true when would_match differs from should_match. robustness_score runs 0-100, where 100 means every case behaves correctly."#
    )
}

pub fn overfit_detection(rule: &str, positives: &[&Example]) -> String {
    format!(
        r#"Check these training examples for overfitting.

## Rule
"{rule}"

## Positive Examples (should match)
{positives}

## Questions
1. Do the examples all share proper nouns, brands or narrow terms that the rule does not mention?
2. Is the rule broader than the examples support?
3. Would the rule miss similar cases phrased without those specific terms?

## Required Output Format (JSON)
{{
  "is_overfit": false,
  "detected_patterns": ["..."],
  "narrow_terms": ["..."],
  "variance_score": 0,
  "recommendation": "Concrete recommendation"
}}

variance_score runs 0-100; higher means more varied, better examples."#,
        positives = quoted_texts(positives),
    )
}

fn boundary_line(example: &Example) -> String {
    format!("- \"{} / {}\"", example.user, example.assistant)
}

pub fn boundary_mapping(rule: &str, positives: &[&Example], negatives: &[&Example]) -> String {
    let render = |examples: &[&Example]| {
        if examples.is_empty() {
            "None provided".to_string()
        } else {
            examples
                .iter()
                .take(BOUNDARY_EXAMPLE_LIMIT)
                .map(|e| boundary_line(e))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    format!(
        r#"Map the boundaries of a classification rule and assess its quality.

## Rule
"{rule}"

## Positive Examples (should match)
{positives}

## Negative Examples (should not match)
{negatives}

## Quality Analysis
- Rule clarity: can you tell what should and should not match?
- Example consistency: do the examples support the rule without contradictions?
- Boundary definition: is the line between matches and non-matches clear?
- Rule scope: too broad, too narrow, or appropriate?

## Generate
1. 5 near-boundary examples that should match.
2. 5 near-boundary examples that should not match.

## Required Output Format (JSON)
{{
  "quality_analysis": {{
    "rule_clarity": "clear|unclear|ambiguous",
    "example_consistency": "consistent|some_contradictions|highly_contradictory",
    "boundary_definition": "well_defined|somewhat_defined|poorly_defined",
    "rule_scope": "appropriate|too_broad|too_narrow",
    "overall_assessment": "good|needs_refinement|poor",
    "issues_found": ["..."],
    "recommendations": ["..."]
  }},
  "examples_inside": [{{"text": "...", "reasoning": "..."}}],
  "examples_outside": [{{"text": "...", "reasoning": "..."}}]
}}"#,
        positives = render(positives),
        negatives = render(negatives),
    )
}

fn keyword_list(rule: &SuggestedRule) -> String {
    if rule.keywords.is_empty() {
        "N/A".to_string()
    } else {
        rule.keywords.join(", ")
    }
}

pub fn training_positive(rule: &SuggestedRule, issue: &str, n: usize) -> String {
    format!(
        r#"Generate {n} varied training examples that MATCH the rule below.

## Issue
"{issue}"

## Rule
ID: {id}
Description: {description}
Example: {example}
Keywords: {keywords}

## Requirements
1. Each example clearly shows the issue the rule describes.
2. Vary the technical context, personas and phrasing.
3. Mix subtle and obvious cases, with realistic technical detail.
4. Each example is one user-assistant exchange.

## Required Output Format (JSON)
{{
  "examples": [
    {{"user": "User message", "assistant": "Assistant response showing the issue", "label": "MATCH"}}
  ]
}}

Generate exactly {n} examples."#,
        id = rule.id,
        description = rule.description,
        example = rule.example,
        keywords = keyword_list(rule),
    )
}

pub fn training_negative(rule: &SuggestedRule, issue: &str, n: usize) -> String {
    format!(
        r#"Generate {n} varied training examples that do NOT match the rule below.

## Issue To Avoid
"{issue}"

## Rule
ID: {id}
Description: {description}
Keywords to reuse outside the issue: {keywords}

## Requirements
1. No example shows the issue; these are successful interactions.
2. Include hard negatives that share keywords in a different context.
3. Include cases where the user struggles and the assistant resolves it.
4. Vary the technical context; each example is one user-assistant exchange.

## Required Output Format (JSON)
{{
  "examples": [
    {{"user": "User message", "assistant": "Helpful response without the issue", "label": "NO_MATCH"}}
  ]
}}

Generate exactly {n} negative examples."#,
        id = rule.id,
        description = rule.description,
        keywords = keyword_list(rule),
    )
}

pub fn routing_classification(prompt_head: &str, task_type: &str) -> String {
    format!(
        r#"Decide how much thinking effort this task needs.

Task type: {task_type}
Prompt (first 500 characters): {prompt_head}

- low: simple validation, classification, straightforward checks
- medium: content generation, moderate analysis, standard processing
- high: complex reasoning, synthesis, boundary analysis, comprehensive evaluation

## Required Output Format (JSON)
{{"effort": "low|medium|high", "reasoning": "Short justification"}}"#
    )
}
