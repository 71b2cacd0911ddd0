//! The research crew: web searcher → analyst → technical writer.

use deepresearch_llm::ModelClient;
use deepresearch_search::SearchClient;
use deepresearch_shared::Result;

use crate::agent::{Agent, Tool};
use crate::pipeline::Pipeline;
use crate::stage::Stage;

pub const SEARCH_STAGE: &str = "search";
pub const ANALYSIS_STAGE: &str = "analysis";
pub const WRITING_STAGE: &str = "writing";

const SEARCH_INSTRUCTION: &str = "\
Search for comprehensive information about the given query: {query}

Use the web search tool results to gather information from multiple sources.
Focus on finding:
- Current and accurate information
- Multiple perspectives on the topic
- Relevant examples and case studies
- Statistical data when available

Provide a detailed summary of your findings.";

const ANALYSIS_INSTRUCTION: &str = "\
Analyze the web search results and synthesize the information.

Based on the web search results, provide:
- Key insights and main points
- Analysis of different perspectives
- Identification of gaps or contradictions
- Verification of important claims
- Structured organization of information

Focus on depth and accuracy in your analysis.";

const WRITING_INSTRUCTION: &str = "\
Create a comprehensive, well-structured written response.

Based on the research and analysis, write a comprehensive answer that:
- Directly addresses the original query: {query}
- Is well-organized with clear sections
- Includes relevant examples and data
- Is written in clear, accessible language
- Provides actionable insights where appropriate
- Includes proper context and background

Format the response in markdown for better readability.";

/// Finds material on the web; the only crew member with a tool.
pub fn web_searcher(search: SearchClient) -> Agent {
    Agent::new(
        "Web Research Specialist",
        "Find comprehensive and relevant information from the web",
        "You are an expert web researcher who excels at finding relevant, accurate, and \
         comprehensive information from various online sources. You use advanced search \
         techniques to gather data from multiple perspectives.",
    )
    .with_tool(Tool::search(search))
}

pub fn research_analyst() -> Agent {
    Agent::new(
        "Research Analyst",
        "Analyze and synthesize information to provide comprehensive insights",
        "You are a skilled research analyst with expertise in synthesizing information from \
         multiple sources. You excel at identifying key insights, verifying facts, and \
         organizing information in a logical manner.",
    )
}

pub fn technical_writer() -> Agent {
    Agent::new(
        "Technical Writer",
        "Create clear, comprehensive, and well-structured written content",
        "You are an expert technical writer who excels at creating clear, comprehensive, and \
         well-structured documents. You can transform complex research into accessible and \
         informative content.",
    )
}

/// Build the three-stage research pipeline.
pub fn research_pipeline(search: SearchClient, llm: ModelClient) -> Result<Pipeline> {
    let stages = vec![
        Stage::new(
            SEARCH_STAGE,
            SEARCH_INSTRUCTION,
            web_searcher(search),
            "A comprehensive summary of web search results with sources",
        ),
        Stage::new(
            ANALYSIS_STAGE,
            ANALYSIS_INSTRUCTION,
            research_analyst(),
            "A structured analysis with key insights and verified information",
        )
        .depends_on(SEARCH_STAGE),
        Stage::new(
            WRITING_STAGE,
            WRITING_INSTRUCTION,
            technical_writer(),
            "A comprehensive, well-formatted markdown document answering the query",
        )
        .depends_on(ANALYSIS_STAGE),
    ];

    Pipeline::new(stages, llm)
}
