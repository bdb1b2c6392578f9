use crate::models::domain::{FigureRecord, QuestionType};

pub const GENERATOR_SYSTEM_PROMPT: &str = "You are an expert radiologist and your job is to design a question for a radiology figure to be answered by a radiology resident.";

pub const VALIDATOR_SYSTEM_PROMPT: &str = "You are an expert educationist and your job is to double-check the question and answer written by the radiologist before they reach a trainee.";

pub const FORMAT_SYSTEM_PROMPT: &str = "You repair malformed structured output. You reply with a single JSON object and nothing else.";

pub const ANSWER_TOO_SHORT_INSTRUCTION: &str = "Your question and options are good, but your provided answer is too short. The answer must be a detailed response to the question in the \"answer\" key of the output JSON and it should explain why the right option is correct based on the figure caption and/or the provided context!";

pub const ANSWER_TOO_LONG_INSTRUCTION: &str = "Your question is good but your provided answer is too long. Please provide a shorter and more concise answer that is suitable for writing on a flash card!";

pub const FIGURE_NUMBER_INSTRUCTION: &str = "Your question discloses the figure number. Refer to the image as \"the figure provided\" or \"the figure above\" and never by its number.";

fn question_instructions(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Mcq => "
        - Craft a question that is clear, concise, and directly related to the figure and context provided.
        - Provide five options, labeled A, B, C, D, and E, under the \"options\" key. Exactly one option is correct.
        - Avoid using 'All of the above' or 'None of the above' among the options.
        - Provide a detailed response to the question in the \"answer\" key that names the correct option and explains why it is correct.",
        QuestionType::ShortAnswer => "
        - Craft a question or statement related to the figure and context that has a one-word or short-phrase response.
        - The question and answer should emphasize recall and be useful for an Anki flashcard.",
        QuestionType::FillInTheBlank => "
        - Write a statement about the figure and context with one or more blanks, each written as \"-----\".
        - The \"answer\" key holds only the words that fill the blanks, in order.",
        QuestionType::OpenEnded => "
        - Craft a question related to the figure and context that encourages a detailed response, analysis, or explanation from the trainee.
        - The question must not contain blanks or options.
        - Provide a detailed response to the question in the \"answer\" key.",
        QuestionType::Anki => "
        - Craft a flashcard-style question with a short, single-fact answer that is useful for spaced repetition.",
    }
}

fn output_shape(question_type: QuestionType) -> &'static str {
    if question_type.requires_options() {
        r#"{"question": "Your question stem here", "options": {"A": "...", "B": "...", "C": "...", "D": "...", "E": "..."}, "answer": "The answer here"}"#
    } else {
        r#"{"question": "Your question here", "answer": "The answer here"}"#
    }
}

pub fn generator_prompt(figure: &FigureRecord, context: &str, question_type: QuestionType) -> String {
    format!(
        "-- Instructions --

You will receive two inputs: the caption of {figure_id} and context text from the article it belongs to.
Based on these inputs, your job is to do the following tasks:

1) Develop a very difficult clinical scenario-based {question_type} question that is directly related to the visual content in the figure.
2) You can also ask about the information provided in the context, but the question should still need the trainee to work out the diagnosis or imaging findings from the figure.
3) You must not mention more than one clinical scenario in the stem of the question.
4) You must not introduce more than one patient in the stem of the question; e.g., avoid stems like \"A 67-year-old man and a 44-year-old man both present with epigastric pain...\".
5) You must not disclose any diagnosis or imaging finding that is mentioned in the figure caption within the question.
6) You must not describe the imaging findings that are mentioned in the figure caption within the question.
7) Reference the figure as \"the figure provided\"; never write its number ({figure_id}).
8) Ensure the question follows these instructions: {instructions}
9) Reply with a single JSON object in exactly this shape and nothing else:
   {shape}

-- Inputs --

## Figure Caption
{caption}

## Context
{context}

--- Your output ---

Please provide the output JSON object below:
",
        figure_id = figure.figure_id,
        question_type = question_type,
        instructions = question_instructions(question_type),
        shape = output_shape(question_type),
        caption = figure.caption_text,
        context = context,
    )
}

pub fn validator_prompt(caption: &str, qa_string: &str, question_type: QuestionType) -> String {
    format!(
        "-- Instructions --

You will receive a figure caption, a question-answer pair written for that figure, and the type of the question.
Check the pair against these rules:

1) The question must not disclose any diagnosis or imaging finding mentioned in the figure caption.
2) The question must describe a single clinical scenario with a single patient.
3) The figure must be referenced (e.g. \"the figure provided\") but never by its number.
4) The question must match its type: an MCQ has labeled options and exactly one correct option; a Fill-in-the-Blank question contains one or more \"-----\" blanks; an Open-Ended question has no blanks and no options.
5) The answer must be correct according to the caption and must answer the question that was asked.

Reply with a single JSON object and nothing else:
{{\"status\": \"Pass\" or \"Fail\", \"message\": \"If Fail, concrete instructions for the author to fix the question; if Pass, a short confirmation\"}}

When you receive a revised pair later in this conversation, judge it against the same rules.

-- Inputs --

## Figure Caption
{caption}

## Question-Answer Pair
{qa_string}

## Type of Question
{question_type}
"
    )
}

pub fn format_prompt(raw: &str, question_type: QuestionType, decode_error: &str, schema: &str) -> String {
    let options_rule = if question_type.requires_options() {
        "The question is an MCQ, so the object must also contain an \"options\" key mapping each label (A, B, C, ...) to its option text."
    } else {
        "The question is not an MCQ, so the object must not contain an \"options\" key."
    };

    format!(
        "Read the input string below and rewrite it as a single valid JSON object.
The object must contain at least the keys \"question\" and \"answer\", both non-empty strings.
{options_rule}

--- Further instructions ---
1. Keep the wording of the question, options, and answer; only fix the structure.
2. Escape any double quote inside a value, or replace it with a backtick.
3. If keys are missing, recover them from the text of the input.
4. Reply with the JSON object only: no prose, no markdown fences.

--- Why the input was rejected ---
{decode_error}

--- JSON schema ---
{schema}

--- Input string ---
{raw}

Please provide the output below:
"
    )
}
