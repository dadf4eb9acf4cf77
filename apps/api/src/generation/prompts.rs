// All LLM prompt templates for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Requirements extraction prompt.
/// Replace: {language_instruction}, {language}, {job_description}, {json_only}
pub const JD_REQUIREMENTS_PROMPT_TEMPLATE: &str = r#"You are an expert HR analyst and job description parser. Extract structured requirements from the following job description.

{language_instruction}

**JOB DESCRIPTION:**
"""
{job_description}
"""

**EXTRACTION RULES:**

1. **Skills (technical and soft skills):**
   - Extract ALL mentioned technical skills (programming languages, tools, frameworks, methodologies)
   - Extract soft skills (communication, leadership, teamwork, etc.)
   - Merge skill variations (e.g., "JavaScript" and "JS" should both appear as "JavaScript")
   - Do NOT include generic terms like "computer skills" unless specific

2. **Responsibilities (key duties):**
   - Extract concrete job duties and tasks
   - Focus on actionable items (what the person will DO)
   - Keep each item concise (1 sentence max)
   - Remove duplicates and merge similar items

3. **Qualifications (required):**
   - Education requirements (degrees, certifications)
   - Experience requirements (years, specific domains)
   - Mandatory certifications, licenses and language requirements
   - ONLY include items explicitly marked as "required" or "must have"

4. **Nice-to-haves (preferred/optional):**
   - Items marked as "preferred", "nice to have", "bonus", "plus", "ideally"
   - Additional skills, certifications or experience that would be beneficial

**OUTPUT FORMAT (JSON ONLY, all values in {language}):**
{
  "skills": ["<skill1>", "<skill2>"],
  "responsibilities": ["<responsibility1>"],
  "qualifications": ["<qualification1>"],
  "niceToHaves": ["<item1>"]
}

**IMPORTANT:**
{json_only}
- Each array should contain 0-15 items (prioritize most important)
- If a category has no items, return an empty array []
- Do NOT invent requirements not mentioned in the description

**Response:**"#;

/// CV content generation prompt.
/// Replace: {language_instruction}, {job_block}, {json_only}
pub const CONTENT_GENERATION_PROMPT_TEMPLATE: &str = r#"You are an expert CV writer. Write CV content for a candidate targeting the job below.

{language_instruction}

**TARGET JOB:**
"""
{job_block}
"""

**OUTPUT FORMAT (JSON ONLY):**
{
  "summary": "<3-4 sentence professional summary>",
  "experience": [
    {
      "company": "<company>",
      "position": "<job title>",
      "startDate": "YYYY-MM",
      "endDate": "YYYY-MM or empty if current",
      "current": false,
      "description": "<role description>",
      "achievements": ["<quantified achievement>"]
    }
  ],
  "skills": [
    {"category": "<category>", "items": ["<skill>"]}
  ],
  "projects": [
    {"name": "<name>", "description": "<description>", "technologies": ["<tech>"], "url": null}
  ]
}

**RULES:**
{json_only}
- Use the exact terminology of the job description for skills and duties
- Address every gap listed in the target job block, if any
- Use strong action verbs and quantify achievements where plausible

**Response:**"#;

/// Header of the gap block appended to the job description on retries.
pub const GAP_BLOCK_HEADER: &str =
    "--- IMPORTANT: Address the following gaps from previous analysis ---";

/// Targeted adaptation of an existing CV.
/// Replace: {language_instruction}, {job_title}, {company}, {current_summary},
/// {current_experience}, {current_skills}, {json_only}, {job_description}
pub const RESUME_ADAPTATION_PROMPT_TEMPLATE: &str = r#"You are an expert career coach. Adapt the candidate's existing CV to the target job with small, targeted changes. Do NOT rewrite the CV.

{language_instruction}

**TARGET JOB:** {job_title} at {company}

**JOB DESCRIPTION:**
"""
{job_description}
"""

**CURRENT SUMMARY:**
{current_summary}

**CURRENT EXPERIENCE (index: position at company - description):**
{current_experience}

**CURRENT SKILLS:**
{current_skills}

**OUTPUT FORMAT (JSON ONLY):**
{
  "patches": {
    "summary": {"original": "<current summary>", "proposed": "<adapted summary>", "confidence": "high|medium|low", "reasoning": "<why>"},
    "experienceDescription": {"experienceIndex": 0, "original": "<current description>", "proposed": "<adapted description>", "confidence": "high|medium|low", "reasoning": "<why>"},
    "skillsToAdd": [{"category": "<new or existing category>", "items": ["<skill>"], "confidence": "high|medium|low", "reasoning": "<why>"}],
    "skillsToEnhance": [{"category": "<existing category>", "itemsToAdd": ["<skill>"], "confidence": "high|medium|low", "reasoning": "<why>"}]
  },
  "analysis": {
    "matchScore": <0-100, how well the CURRENT CV matches the job>,
    "keyGaps": ["<missing skill or experience>"],
    "strengths": ["<what already matches well>"]
  }
}

**RULES:**
{json_only}
- Only propose skills the candidate can plausibly claim from the current CV
- Omit a patch entirely when no change is needed
- experienceIndex must refer to an entry in CURRENT EXPERIENCE
- Use the exact terminology of the job description

**Response:**"#;
