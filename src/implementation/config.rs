// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module defines the configuration objects of the goods trees and of
//! the protocol runtimes. Both come with a builder, e.g.
//!
//! ```
//! # use odpop::*;
//! let config = SolverConfigBuilder::default()
//!     .maximize(false)
//!     .share_domains(false)
//!     .build()
//!     .unwrap();
//! assert!(!config.maximize);
//! assert!(config.collect_stats);
//! ```

use derive_builder::Builder;

use crate::Objective;

/// This is how you configure a goods tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct TreeConfig {
    /// True (default) when the utility is to be maximized
    #[builder(default="true")]
    pub maximize: bool,
    /// True when the tree must maintain its statistics counters (tree fill,
    /// dummy fill, ...). This costs a bit of time on every leaf creation.
    #[builder(default="false")]
    pub collect_stats: bool,
    /// True when the tree works with online domains and speculative goods
    /// (that is, for ASODPOP). A speculative tree accepts goods bearing on
    /// variables and values it has never heard of.
    #[builder(default="false")]
    pub speculative: bool,
}
impl TreeConfig {
    pub fn objective(&self) -> Objective {
        Objective::new(self.maximize)
    }
}
impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig { maximize: true, collect_stats: false, speculative: false }
    }
}

/// This is how you configure the protocol runtimes and the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct SolverConfig {
    /// True (default) when the utility is to be maximized
    #[builder(default="true")]
    pub maximize: bool,
    /// True (default) when the variables must send their assignment reports
    /// (tree fill, goods sent, ...) to the statistics collector
    #[builder(default="true")]
    pub collect_stats: bool,
    /// True (default) when separator growth messages carry the complete
    /// domains of the reported variables. Otherwise they only carry the
    /// final domain sizes and the receiver learns the values online.
    #[builder(default="true")]
    pub share_domains: bool,
    /// The maximum number of messages a simulation may deliver
    #[builder(default="1_000_000")]
    pub message_budget: usize,
    /// When set, the simulator delivers the pending messages in a random
    /// order drawn from this seed instead of first in first out. Only
    /// ASODPOP is meant to cope with links that reorder messages.
    #[builder(default, setter(strip_option))]
    pub delivery_seed: Option<u64>,
}
impl SolverConfig {
    pub fn objective(&self) -> Objective {
        Objective::new(self.maximize)
    }
    /// The configuration of the goods tree of one variable
    pub fn tree_config(&self, speculative: bool) -> TreeConfig {
        TreeConfig { maximize: self.maximize, collect_stats: self.collect_stats, speculative }
    }
}
impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { maximize: true, collect_stats: true, share_domains: true, message_budget: 1_000_000, delivery_seed: None }
    }
}
