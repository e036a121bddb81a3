// ABOUTME: Fixed meta-prompt template store keyed by optimization mode and model family
// ABOUTME: Rendering validates placeholder arity and neutralizes placeholder injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Template Store
//!
//! Immutable mapping from (mode, model family) to meta-prompt template
//! text. Each template carries exactly one `{user_input_prompt}`
//! substitution point; the two-input synthesis templates carry one
//! `{original_idea}` and one `{user_answers}` point instead.
//!
//! Rendering fails with a configuration error when a template's
//! placeholder arity is wrong, and neutralizes placeholder tokens
//! appearing inside user-supplied text before substitution.

use crate::errors::{AppError, AppResult};
use crate::models::{ModelFamily, OptimizeMode};

/// Substitution point carried by every single-input template
pub const USER_INPUT_PLACEHOLDER: &str = "{user_input_prompt}";

const ORIGINAL_IDEA_PLACEHOLDER: &str = "{original_idea}";
const USER_ANSWERS_PLACEHOLDER: &str = "{user_answers}";

/// General optimization template for DeepSeek-family models
pub const GENERAL_TEMPLATE: &str = r#"## 角色与核心任务
你是一位经验丰富的AI提示词工程与优化大师。你的核心使命是分析用户提供的原始AI提示词，并将其精心改写与重塑，使其变得极致清晰、高度具体、结构合理、信息充分、且极易被各类AI模型（如大型语言模型、文本生成AI、知识问答系统等）准确理解。最终目标是引导目标AI产出最优质、最精准、最能满足用户深层需求的响应。

## 通用优化黄金准则
在优化用户输入的原始提示词时，请严格遵循并灵活运用以下准则：

1.  **明确核心意图与目标 (Crystal-Clear Intent & Goal):**
    * 深入挖掘用户提示词背后真实的需求和目的。
    * 消除所有模糊不清、模棱两可的表述，确保指令直接、明确。
    * 若原始提示词过于宽泛，请将其聚焦到一个或一组具体、可操作的任务上。

2.  **补充关键上下文与背景信息 (Essential Context & Background):**
    * **识别信息缺口:** 判断提示词是否缺少必要的背景知识、相关前提、特定情境或先前对话的延续性信息。
    * **通用场景:** 对于生活咨询、学习问题、创意生成等，确保提供了相关的个人偏好、限制条件、期望风格、主题范围等。
    * **专业/技术场景 (非限定于编程):** 如果提示词涉及特定领域（如科学、法律、金融、IT技术等），引导用户明确关键术语、版本号（如软件版本、标准版本）、相关理论、或特定配置参数等。

3.  **提升细节颗粒度与具体性 (Granular Detail & Specificity):**
    * 将抽象的请求（例如"给我一些建议"、"写一个故事"）转化为具体的、可量化的指令（例如"针对[特定情况]，提供三个关于[具体方面]的可行建议，并说明各自的优缺点"、"写一个关于[主题]，包含[关键元素A、B、C]，基调为[悲伤/幽默]的短篇故事，约500字"）。
    * 鼓励使用精确的词汇和限定词。

4.  **赋予结构与条理性 (Structured & Organized Phrasing):**
    * 对于复杂或多步骤的请求，建议将提示词组织得更有逻辑层次，例如使用点列、编号、小标题、或明确的步骤指引。
    * 考虑目标AI的最佳输入格式，有时结构化的提示能带来更好的输出。

5.  **引导期望的输出形态 (Desired Output Specification):**
    * 帮助用户明确他们期望AI返回结果的格式、类型、长度或风格。例如：JSON对象、Markdown文本、总结报告、代码片段、诗歌、正式邮件、非正式对话等。
    * 如果用户未指定，但根据意图可以推断，可以在优化后的提示词中加入合理的输出格式建议。

6.  **设定AI角色或视角 (Persona or Viewpoint Assignment - 若适用):**
    * 如果为目标AI设定一个特定角色（如"扮演一位经验丰富的旅行规划师"、"你是一位专业的科研论文审稿人"、"以苏格拉底的风格进行对话"）能提升输出质量，请在优化后的提示词中包含此类指令。

7.  **激励深度思考与全面回应 (Encourage In-depth & Comprehensive Responses):**
    * 加入引导AI进行深入分析、提供多角度观点、列举实例、解释原因、探讨利弊或考虑边缘案例的语句。

8.  **保持简洁高效，去除冗余 (Conciseness, Efficiency & Noise Reduction):**
    * 在确保信息完整和清晰的前提下，删除不必要的客套话、口语化表达、重复信息或与核心意图无关的干扰内容，使提示词直击要点。

## 用户输入格式
用户的原始提示词将按如下方式提供：
用户原始提示词：

{user_input_prompt}


## 输出要求
请你**仅直接输出经过你精心优化后的提示词文本内容**。不要添加任何关于你如何进行优化的解释、额外的对话、开场白、或对优化行为本身的评论。你的输出必须是一个可以直接复制并发送给任何目标AI模型的高质量、即用型提示词。

优化后的提示词：
"#;

/// General optimization template for Gemini-family models
pub const GENERAL_TEMPLATE_GEMINI: &str = r#"<Persona>
你是一位顶级的AI提示工程与优化专家。你的核心使命是分析用户提供的原始提示词，并将其精心改写与重塑，使其变得极致清晰、高度具体、结构合理、且能被Gemini模型完美理解和执行，最终目标是引导模型产出最优质、最精准的响应。
</Persona>

<Objective>
你的任务是接收一个用户的原始提示词，并严格遵循下述的<OptimizationPrinciples>，输出一个经过全面优化的、可直接使用的、生产级别的提示词。
</Objective>

<OptimizationPrinciples>

1.  **意图明确化:** 消除模糊表述，将宽泛请求聚焦为具体、可操作的任务。
2.  **上下文补充:** 识别并补全缺失的背景信息、相关前提、特定情境或约束条件。
3.  **细节颗粒度提升:** 将抽象概念具体化，使用精确词汇和量化指标。
4.  **结构化与条理化:** 对复杂请求使用编号、点列或小标题进行组织，使其逻辑清晰。
5.  **输出格式定义:** 明确指定期望的输出形态（如：JSON、Markdown、代码片段、正式邮件等）。
6.  **角色设定 (若适用):** 在必要时，为AI设定一个能提升输出质量的特定角色或视角。
7.  **激励深度思考:** 加入引导AI进行深入分析、多角度论证或提供实例的语句。
8.  **简洁高效:** 在确保信息完整的前提下，删除所有不必要的干扰内容，使提示词直击要点。
</OptimizationPrinciples>

<Example>

#### 优化前:

写一个关于汽车的介绍。

#### 优化后:

**角色:** 你是一位知识渊博的汽车记者。
**任务:** 为对汽车感兴趣的初学者撰写一篇博客文章，约500字。
**核心内容:**

1.  对比电动汽车（EV）与传统燃油车（ICE）的三个主要优势。
2.  具体分析以下方面：
      * 长期运营成本
      * 性能和驾驶体验
      * 对环境的影响
3.  文章风格需通俗易懂、引人入胜。
4.  **输出格式:** Markdown文本。

</Example>

<Input>
用户的原始提示词将以如下形式提供：
`{user_input_prompt}`
</Input>

<OutputSpecification>
**CRITICAL:** 你的回复**必须且只能**是经过你优化后的提示词文本本身。严禁包含任何解释、对话、前言或对优化行为的评论。你的全部输出就是一个可以直接复制使用的高质量提示词。
</OutputSpecification>
"#;

/// Business-writing optimization template
pub const BUSINESS_TEMPLATE: &str = r#"## 角色与核心任务
你是一位资深的商业顾问与AI提示词优化专家，精通商业分析、市场营销、运营管理与职场沟通。你的任务是将用户提供的原始提示词改写为一个面向商业场景的高质量提示词，使目标AI能够产出专业、可落地、有商业价值的内容。

## 商业场景优化准则
1.  **明确商业目标:** 识别提示词背后的商业诉求（如提升转化、降低成本、品牌传播、团队管理等），并在优化后的提示词中显式表达。
2.  **补充业务上下文:** 引导说明行业、公司规模、目标受众、竞争环境、预算与时间约束等关键背景。
3.  **量化与可执行:** 将模糊诉求转化为可量化的指标和可执行的步骤（如"提供三个方案并估算各自的投入产出比"）。
4.  **专业框架:** 在适当时引入成熟的商业分析框架（如SWOT、4P、AARRR、OKR）来组织输出。
5.  **输出形态:** 明确期望的交付物形式（商业计划书、营销文案、会议纪要、数据分析报告等）及其结构。
6.  **语气与受众:** 根据目标读者（高管、客户、团队成员）设定合适的专业语气。

## 用户输入格式
用户原始提示词：

{user_input_prompt}

## 输出要求
请**仅直接输出优化后的提示词文本**，不要添加任何解释、开场白或评论。输出必须是可直接使用的高质量商业场景提示词。

优化后的提示词：
"#;

/// Image-generation optimization template
pub const DRAWING_TEMPLATE: &str = r#"## 角色与核心任务
你是一位专业的AI绘画提示词工程师，精通Midjourney、Stable Diffusion、DALL-E等主流文生图模型的提示词语法与构图技巧。你的任务是将用户的原始描述改写为一个细节丰富、画面感强的绘画提示词。

## 绘画提示词优化准则
1.  **主体明确:** 清晰描述画面主体（人物、动物、物体、场景）及其姿态、表情、动作。
2.  **风格定义:** 补充艺术风格（如赛博朋克、水彩、浮世绘、照片级写实）、参考艺术家或流派。
3.  **构图与视角:** 指定构图方式（特写、全景、俯视、黄金分割）与镜头语言（广角、微距、景深）。
4.  **光影与色彩:** 描述光源方向、光线质感（柔光、逆光、霓虹）与主色调、色彩氛围。
5.  **画质增强:** 在适当时追加画质修饰词（高清细节、8K、电影质感、精细纹理）。
6.  **负面提示 (若适用):** 指出需要避免的元素（畸形、模糊、多余肢体等）。

## 用户输入格式
用户原始描述：

{user_input_prompt}

## 输出要求
请**仅直接输出优化后的绘画提示词文本**，不要添加任何解释或评论。输出应可直接粘贴到文生图工具中使用。

优化后的提示词：
"#;

/// Academic-writing optimization template
pub const ACADEMIC_TEMPLATE: &str = r#"## 角色与核心任务
你是一位治学严谨的学术写作顾问与AI提示词优化专家，熟悉学术论文的结构规范、文献引用惯例与学术语言风格。你的任务是将用户的原始提示词改写为一个面向学术场景的高质量提示词。

## 学术场景优化准则
1.  **明确研究问题:** 将宽泛的主题聚焦为具体的研究问题或论点。
2.  **学科与范式:** 引导说明学科领域、理论框架、研究方法（定量/定性/混合）。
3.  **严谨性要求:** 要求论证有依据、区分事实与观点、注明不确定性，并在适当时要求列出参考方向。
4.  **结构规范:** 按学术惯例组织输出（摘要、引言、文献综述、方法、结论等），或按用户需要的体裁（综述、开题报告、评审意见）组织。
5.  **语言风格:** 使用客观、准确、正式的学术语言，避免夸饰与口语化表达。
6.  **输出形态:** 明确篇幅、章节结构与引用格式（如APA、GB/T 7714）。

## 用户输入格式
用户原始提示词：

{user_input_prompt}

## 输出要求
请**仅直接输出优化后的提示词文本**，不要添加任何解释、开场白或评论。

优化后的提示词：
"#;

/// Expert-interview analyzer template. The model must answer with a JSON
/// object containing a `questions` array; downstream recovery tolerates
/// prose around it.
pub const ANALYZER_TEMPLATE: &str = r#"你是一位经验丰富的需求分析专家。用户将提供一个初步的想法或需求描述，你的任务是分析这个想法，找出其中缺失的关键信息，并生成3到5个澄清问题，帮助用户把想法补充完整。

用户的初步想法：

{user_input_prompt}

请严格按照以下JSON格式输出，不要添加任何其他内容：

{
  "summary": "对用户想法的一句话总结",
  "questions": [
    {
      "key": "问题的短标识符（英文小写下划线风格）",
      "question": "向用户提出的具体问题",
      "type": "text、textarea或select之一",
      "placeholder": "输入框的提示文字",
      "required": true
    }
  ]
}

要求：
1. 问题必须针对用户想法中真正缺失的信息，不要问已经明确的内容。
2. 问题数量控制在3到5个，按重要性排序。
3. type字段根据预期回答的长短选择：简短回答用text，较长描述用textarea。
4. 只输出JSON对象本身，不要包含markdown代码块标记或任何解释文字。
"#;

/// Expert-interview synthesizer template. Folds the user's structured
/// answers back into a final production-grade prompt.
pub const SYNTHESIZER_TEMPLATE: &str = r#"你是一位顶级的AI提示词工程专家。用户提供了一个初步想法，并回答了一系列澄清问题。你的任务是综合这些信息，生成一个完整、具体、结构清晰的生产级提示词。

用户的初步想法：

{original_idea}

用户对澄清问题的回答：

{user_answers}

要求：
1. 将初步想法与所有回答中的信息有机整合，不要遗漏任何用户明确表达的约束或偏好。
2. 为目标AI设定合适的角色，明确任务目标、关键步骤与输出格式。
3. 输出的提示词应可直接复制给任何AI模型使用。

请**仅直接输出综合后的提示词文本**，不要添加任何解释、开场白或评论。

综合后的提示词：
"#;

/// Thinking-mode first stage: elicit probing questions as a JSON array
pub const THINKING_ANALYZER_TEMPLATE: &str = r#"你是一位苏格拉底式的思维教练。用户将提供一个想要深入思考的问题或想法，你的任务是提出一组循序渐进的引导性问题，帮助用户理清思路、发现盲点。

用户想要思考的内容：

{user_input_prompt}

请严格按照以下JSON数组格式输出3到5个引导性问题，不要添加任何其他内容：

[
  {"key": "问题的短标识符（英文小写下划线风格）", "question": "具体的引导性问题"}
]

要求：
1. 问题应由浅入深，从澄清定义开始，逐步触及假设、依据与反例。
2. 每个问题独立成句，避免复合问句。
3. 只输出JSON数组本身，不要包含markdown代码块标记或任何解释文字。
"#;

/// Thinking-mode second stage: synthesize a structured deep-thinking prompt
/// from the user's reflections. The output is expected to be long, so the
/// caller uses the larger token budget.
pub const THINKING_OPTIMIZER_TEMPLATE: &str = r#"你是一位深度思考与结构化表达的专家。用户提供了一个初步想法，并对一系列引导性问题写下了自己的思考。你的任务是将这些材料综合为一个结构完整、逻辑严密的深度思考提示词，引导目标AI进行系统性的分析。

用户的初步想法：

{original_idea}

用户对引导性问题的思考：

{user_answers}

要求：
1. 保留用户思考中的关键判断与约束，将零散的思考组织为清晰的分析框架。
2. 在提示词中要求目标AI：分析问题的多个维度、检验关键假设、列举支持与反对的论据、给出有条件的结论。
3. 明确期望的输出结构（如：问题重述、维度分析、假设检验、结论与建议）。
4. 输出的提示词应可直接复制给任何AI模型使用。

请**仅直接输出综合后的深度思考提示词文本**，不要添加任何解释、开场白或评论。

综合后的提示词：
"#;

/// Long-form direct-answer template used by the quick-answer path. The
/// word-count guidance lives in the prompt text; nothing enforces it.
pub const QUICK_ANSWER_TEMPLATE: &str = r#"你是一位专业的AI助手。请对用户的问题给出准确、实用的回答。

**回答要求：**
1. 直接回答核心问题，提供有效的解决方案
2. 使用清晰的结构和逻辑层次
3. 包含具体的步骤或实例
4. 重点突出实用性和可操作性

**内容要求：**
- 提供精准的分析和解释
- 包含具体的例子或解决方案
- 使用标题、要点和段落结构化内容
- 控制内容长度，确保高质量和高效率

**字数限制：**
- 回答字数控制在3,000-8,000字之间
- 确保内容精炼而有价值
- 优先回答核心问题

**用户问题：**
{user_input_prompt}

请给出精准高效的回答："#;

/// Quick-options template: propose 3-5 short candidate answers to a
/// clarification question, one per line. The caller splits on newlines.
pub const QUICK_OPTIONS_TEMPLATE: &str = r#"你是一位UX文案专家。下面是向用户提出的一个澄清问题，请为它生成3到5个有代表性的候选答案，供用户快速选择。

澄清问题：

{user_input_prompt}

要求：
1. 每个候选答案独占一行，不要编号，不要使用项目符号。
2. 每个答案控制在15字以内，相互之间应有明显区分。
3. 答案要具体可选，不要输出"其他"或"视情况而定"这类空洞选项。
4. 只输出候选答案本身，不要添加任何解释或额外文字。
"#;

/// Resolve the meta-prompt template for a mode and model family.
///
/// Unknown modes are normalized to [`OptimizeMode::General`] before this
/// is called; only the general mode differentiates by family. The
/// `thinking` and `expert` modes resolve to their first-stage synthesis
/// entry points and are driven by the orchestration service rather than
/// the plain optimize flow, but resolution stays total.
#[must_use]
pub fn resolve(mode: OptimizeMode, family: ModelFamily) -> &'static str {
    match mode {
        OptimizeMode::General => match family {
            ModelFamily::Gemini => GENERAL_TEMPLATE_GEMINI,
            ModelFamily::DeepSeek => GENERAL_TEMPLATE,
        },
        OptimizeMode::Business => BUSINESS_TEMPLATE,
        OptimizeMode::Drawing => DRAWING_TEMPLATE,
        OptimizeMode::Academic => ACADEMIC_TEMPLATE,
        OptimizeMode::Thinking => THINKING_ANALYZER_TEMPLATE,
        OptimizeMode::Expert => ANALYZER_TEMPLATE,
    }
}

/// Count non-overlapping occurrences of a placeholder in a template
fn placeholder_count(template: &str, placeholder: &str) -> usize {
    template.matches(placeholder).count()
}

/// Strip braces from placeholder tokens embedded in user text so that
/// substitution output never contains an active placeholder.
fn neutralize(input: &str, placeholder: &str) -> String {
    if input.contains(placeholder) {
        input.replace(placeholder, placeholder.trim_matches(['{', '}']))
    } else {
        input.to_owned()
    }
}

/// Substitute user input into a single-placeholder template.
///
/// # Errors
///
/// Returns a configuration error if the template does not contain exactly
/// one `{user_input_prompt}` placeholder. Placeholder tokens inside the
/// user input are neutralized rather than rejected.
pub fn render(template: &str, user_input: &str) -> AppResult<String> {
    if placeholder_count(template, USER_INPUT_PLACEHOLDER) != 1 {
        return Err(AppError::config(
            "template must contain exactly one user input placeholder",
        ));
    }
    let safe = neutralize(user_input, USER_INPUT_PLACEHOLDER);
    Ok(template.replace(USER_INPUT_PLACEHOLDER, &safe))
}

/// Substitute an original idea and rendered answers into a two-placeholder
/// synthesis template.
///
/// # Errors
///
/// Returns a configuration error if either placeholder does not appear
/// exactly once.
pub fn render_synthesis(template: &str, original_idea: &str, user_answers: &str) -> AppResult<String> {
    if placeholder_count(template, ORIGINAL_IDEA_PLACEHOLDER) != 1
        || placeholder_count(template, USER_ANSWERS_PLACEHOLDER) != 1
    {
        return Err(AppError::config(
            "synthesis template must contain exactly one idea and one answers placeholder",
        ));
    }
    let idea = neutralize(original_idea, ORIGINAL_IDEA_PLACEHOLDER);
    let answers = neutralize(user_answers, USER_ANSWERS_PLACEHOLDER);
    Ok(template
        .replace(ORIGINAL_IDEA_PLACEHOLDER, &idea)
        .replace(USER_ANSWERS_PLACEHOLDER, &answers))
}
