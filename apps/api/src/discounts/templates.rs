//! Extraction templates and chain definitions.
//!
//! Chains are data: each `ChainSpec` lists its steps in send order, and each
//! step names the table it fills, the model tier of the session it runs in,
//! its instruction text and any earlier tables whose responses it quotes.
//! `run_chain` interprets these definitions; nothing here talks to the model.

use std::collections::HashMap;

use serde_json::Value;

use crate::discounts::prompts::{
    ACCESSORIALS_INSTRUCTION, BAND_EXAMPLE_CHARGE, BAND_EXAMPLE_RESPONSE, BAND_QUERY_TEMPLATE,
    DOMESTIC_AIR_INSTRUCTION, DOMESTIC_GROUND_CWT_INSTRUCTION,
    DOMESTIC_GROUND_INCENTIVES_OFF_INSTRUCTION, DOMESTIC_GROUND_PORTFOLIO_INSTRUCTION,
    EXTRACTION_EXAMPLE_QUERY, EXTRACTION_EXAMPLE_RESPONSE, INTERNATIONAL_CONSOLIDATE_INSTRUCTION,
    INTERNATIONAL_CURRENT_INSTRUCTION, INTERNATIONAL_INCENTIVES_OFF_INSTRUCTION,
};
use crate::llm_client::{Content, ModelTier, RemoteFile};

/// Every table the service extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableId {
    DomesticAir,
    Accessorials,
    DomesticGround1,
    DomesticGround2,
    DomesticGround3,
    International1,
    International2,
    ConsolidatedInternational,
}

impl TableId {
    pub const ALL: [TableId; 8] = [
        TableId::DomesticAir,
        TableId::Accessorials,
        TableId::DomesticGround1,
        TableId::DomesticGround2,
        TableId::DomesticGround3,
        TableId::International1,
        TableId::International2,
        TableId::ConsolidatedInternational,
    ];

    /// Logical name, also used as the `{key}` placeholder in later prompts.
    pub fn key(self) -> &'static str {
        match self {
            TableId::DomesticAir => "domesticAir",
            TableId::Accessorials => "accessorials",
            TableId::DomesticGround1 => "domesticGround1",
            TableId::DomesticGround2 => "domesticGround2",
            TableId::DomesticGround3 => "domesticGround3",
            TableId::International1 => "international1",
            TableId::International2 => "international2",
            TableId::ConsolidatedInternational => "consolidatedInternational",
        }
    }

    /// The JSON skeleton sent to the model: keys fixed, values empty.
    pub fn skeleton(self) -> &'static str {
        match self {
            TableId::DomesticAir => DOMESTIC_AIR_SKELETON,
            TableId::Accessorials => ACCESSORIALS_SKELETON,
            TableId::DomesticGround1 => DOMESTIC_GROUND_PORTFOLIO_SKELETON,
            TableId::DomesticGround2 => DOMESTIC_GROUND_INCENTIVES_OFF_SKELETON,
            TableId::DomesticGround3 => DOMESTIC_GROUND_CWT_SKELETON,
            TableId::International1 => INTERNATIONAL_CURRENT_SKELETON,
            TableId::International2 => INTERNATIONAL_INCENTIVES_OFF_SKELETON,
            TableId::ConsolidatedInternational => INTERNATIONAL_CONSOLIDATED_SKELETON,
        }
    }

    pub fn template(self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.skeleton())
    }
}

#[derive(Debug)]
pub struct ChainStep {
    pub table: TableId,
    pub tier: ModelTier,
    pub instruction: &'static str,
    /// Earlier tables of the same chain whose responses are quoted into the instruction.
    pub references: &'static [TableId],
}

#[derive(Debug)]
pub struct ChainSpec {
    pub name: &'static str,
    pub steps: &'static [ChainStep],
}

impl ChainSpec {
    pub fn tables(&self) -> impl Iterator<Item = TableId> + '_ {
        self.steps.iter().map(|s| s.table)
    }
}

pub const DOMESTIC_AIR_ACCESSORIALS_CHAIN: ChainSpec = ChainSpec {
    name: "domestic-air-accessorials",
    steps: &[
        ChainStep {
            table: TableId::DomesticAir,
            tier: ModelTier::Baseline,
            instruction: DOMESTIC_AIR_INSTRUCTION,
            references: &[],
        },
        ChainStep {
            table: TableId::Accessorials,
            tier: ModelTier::Baseline,
            instruction: ACCESSORIALS_INSTRUCTION,
            references: &[],
        },
    ],
};

/// Portfolio-tier tables go to the advanced model; the CWT/commodity tier stays on
/// the baseline session.
pub const DOMESTIC_GROUND_CHAIN: ChainSpec = ChainSpec {
    name: "domestic-ground",
    steps: &[
        ChainStep {
            table: TableId::DomesticGround1,
            tier: ModelTier::Advanced,
            instruction: DOMESTIC_GROUND_PORTFOLIO_INSTRUCTION,
            references: &[],
        },
        ChainStep {
            table: TableId::DomesticGround2,
            tier: ModelTier::Advanced,
            instruction: DOMESTIC_GROUND_INCENTIVES_OFF_INSTRUCTION,
            references: &[],
        },
        ChainStep {
            table: TableId::DomesticGround3,
            tier: ModelTier::Baseline,
            instruction: DOMESTIC_GROUND_CWT_INSTRUCTION,
            references: &[],
        },
    ],
};

/// The third step is a text-level join: the model receives both earlier
/// responses and merges them. Only JSON syntax and key structure are verified.
pub const INTERNATIONAL_CHAIN: ChainSpec = ChainSpec {
    name: "international",
    steps: &[
        ChainStep {
            table: TableId::International1,
            tier: ModelTier::Advanced,
            instruction: INTERNATIONAL_CURRENT_INSTRUCTION,
            references: &[],
        },
        ChainStep {
            table: TableId::International2,
            tier: ModelTier::Advanced,
            instruction: INTERNATIONAL_INCENTIVES_OFF_INSTRUCTION,
            references: &[],
        },
        ChainStep {
            table: TableId::ConsolidatedInternational,
            tier: ModelTier::Baseline,
            instruction: INTERNATIONAL_CONSOLIDATE_INSTRUCTION,
            references: &[TableId::International1, TableId::International2],
        },
    ],
};

pub const ALL_CHAINS: [&ChainSpec; 3] = [
    &DOMESTIC_AIR_ACCESSORIALS_CHAIN,
    &DOMESTIC_GROUND_CHAIN,
    &INTERNATIONAL_CHAIN,
];

/// Builds the prompt for `step`: instruction with `{band}` and referenced
/// responses substituted, followed by the table skeleton.
pub fn render_prompt(step: &ChainStep, band: &str, prior: &HashMap<TableId, String>) -> String {
    let mut instruction = step.instruction.replace("{band}", band);
    for reference in step.references {
        let text = prior.get(reference).map(String::as_str).unwrap_or("null");
        instruction = instruction.replace(&format!("{{{}}}", reference.key()), text);
    }
    format!("{instruction}\n\n{}", step.table.skeleton())
}

/// The example exchange every extraction session starts with.
pub fn extraction_priming(document: &RemoteFile, band: &str) -> Vec<Content> {
    vec![
        Content::user_with_document(document, EXTRACTION_EXAMPLE_QUERY.replace("{band}", band)),
        Content::model(EXTRACTION_EXAMPLE_RESPONSE),
    ]
}

/// The example exchange the band resolver starts with.
pub fn band_priming(document: &RemoteFile) -> Vec<Content> {
    vec![
        Content::user_with_document(document, render_band_query(BAND_EXAMPLE_CHARGE)),
        Content::model(BAND_EXAMPLE_RESPONSE),
    ]
}

pub fn render_band_query(charge: &str) -> String {
    BAND_QUERY_TEMPLATE.replace("{charge}", charge)
}

// ── Skeletons ───────────────────────────────────────────────────────────────

const DOMESTIC_AIR_SKELETON: &str = r#"{
  "Domestic Air Service Level": {
    "Next Day Air": {
      "Letter": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Next Day Air Saver": {
      "Letter": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "2nd Day AM": {
      "Letter": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "2nd Day Air": {
      "Letter": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "3 Day Select": {
      "Package": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Next Day Air CWT": {
      "Weight Range": "All",
      "Current UPS": ""
    },
    "Next Day Air Saver CWT": {
      "Weight Range": "All",
      "Current UPS": ""
    },
    "2nd Day AM CWT": {
      "Weight Range": "All",
      "Current UPS": ""
    },
    "2nd Day Air CWT": {
      "Weight Range": "All",
      "Current UPS": ""
    },
    "3 Day Select CWT": {
      "Weight Range": "All",
      "Current UPS": ""
    }
  }
}"#;

const ACCESSORIALS_SKELETON: &str = r#"[
  {
    "ACCESSORIAL_CHARGE": "DAS Comm",
    "TERM": "Air",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Ext Comm",
    "TERM": "Air",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Resi",
    "TERM": "Air",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Ext Resi",
    "TERM": "Air",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Comm",
    "TERM": "Ground",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Ext Comm",
    "TERM": "Ground",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Resi",
    "TERM": "Ground",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "DAS Ext Resi",
    "TERM": "Ground",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "Residential Fee",
    "TERM": "Air",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "Residential Fee",
    "TERM": "Ground",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "Additional Handling - ALL",
    "TERM": "Domestic",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "Additional Handling - ALL",
    "TERM": "Export",
    "CURRENT_UPS": ""
  },
  {
    "ACCESSORIAL_CHARGE": "Duty and Tax Forwarding",
    "TERM": "Export",
    "CURRENT_UPS": ""
  }
]"#;

const DOMESTIC_GROUND_PORTFOLIO_SKELETON: &str = r#"{
  "DOMESTIC GROUND SERVICE LEVEL": {
    "UPS® Ground - Commercial Package - Prepaid": {
      "Weight Range": "All",
      "Current UPS": ""
    },
    "UPS® Ground - Residential Package - Prepaid": {
      "Weight Range": "All",
      "Current UPS": ""
    }
  }
}"#;

const DOMESTIC_GROUND_INCENTIVES_OFF_SKELETON: &str = r#"{
  "DOMESTIC GROUND SERVICE LEVEL": {
    "UPS® Ground - Commercial Package - Prepaid - Incentives Off Effective Rates": {
      "1-5 lbs": "",
      "6-10 lbs": "",
      "11-20 lbs": "",
      "21-30 lbs": "",
      "31-50 lbs": "",
      "51-70 lbs": "",
      "71-150 lbs": "",
      "151 lbs+": ""
    },
    "UPS® Ground - Residential Package - Prepaid - Incentives Off Effective Rates": {
      "1-5 lbs": "",
      "6-10 lbs": "",
      "11-20 lbs": "",
      "21-30 lbs": "",
      "31-50 lbs": "",
      "51-70 lbs": "",
      "71-150 lbs": "",
      "151 lbs+": ""
    }
  }
}"#;

const DOMESTIC_GROUND_CWT_SKELETON: &str = r#"{
  "DOMESTIC GROUND SERVICE LEVEL": {
    "Ground CWT": {
      "Weight Range": "All",
      "Current UPS": "",
      "Discount": "",
      "Tier": ""
    }
  }
}"#;

const INTERNATIONAL_CURRENT_SKELETON: &str = r#"{
  "INTERNATIONAL SERVICE LEVEL": {
    "Export": {
      "UPS Worldwide Express®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Pak": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": ""
        }
      },
      "UPS Worldwide Saver®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Pak": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": ""
        }
      },
      "UPS Worldwide Expedited®": {
        "Document": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": ""
        }
      },
      "UPS® Standard to Canada": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "UPS® Standard to Mexico": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Import": {
      "UPS Worldwide Express®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": ""
        }
      },
      "UPS Worldwide Saver®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": ""
        }
      },
      "UPS Worldwide Expedited®": {
        "Package": {
          "Weight Range": "All",
          "Current UPS": ""
        }
      },
      "UPS® Standard from Canada": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "UPS® Standard from Mexico": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    }
  }
}"#;

const INTERNATIONAL_INCENTIVES_OFF_SKELETON: &str = r#"{
  "International Service Level": {
    "Export UPS Worldwide Express®": {
      "Letter - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Document - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Pak - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Export UPS Worldwide Saver®": {
      "Letter - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Document - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Pak - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Export UPS Worldwide Expedited®": {
      "Document - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Import UPS Worldwide Express®": {
      "Letter - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Document - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Import UPS Worldwide Saver®": {
      "Letter - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Document - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "Package - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Import UPS Worldwide Expedited®": {
      "Package - Incentives Off Effective Rates": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    }
  }
}"#;

const INTERNATIONAL_CONSOLIDATED_SKELETON: &str = r#"{
  "INTERNATIONAL SERVICE LEVEL": {
    "Export": {
      "UPS Worldwide Express®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Pak": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        }
      },
      "UPS Worldwide Saver®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Pak": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        }
      },
      "UPS Worldwide Expedited®": {
        "Document": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        }
      },
      "UPS® Standard to Canada": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "UPS® Standard to Mexico": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    },
    "Import": {
      "UPS Worldwide Express®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        }
      },
      "UPS Worldwide Saver®": {
        "Letter": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Document": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        },
        "Package": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        }
      },
      "UPS Worldwide Expedited®": {
        "Package": {
          "Weight Range": "All",
          "Current UPS": "",
          "Incentives Off Effective Rates": ""
        }
      },
      "UPS® Standard from Canada": {
        "Weight Range": "All",
        "Current UPS": ""
      },
      "UPS® Standard from Mexico": {
        "Weight Range": "All",
        "Current UPS": ""
      }
    }
  }
}"#;
