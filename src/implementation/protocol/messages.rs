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

//! This module defines the messages exchanged by the variables during the
//! UTIL and VALUE propagation phases, as well as the reports they hand over
//! to the statistics collector.

use crate::{Context, Domains, Good, Utility, Value};

/// A message travelling between two variables
#[derive(Debug, Clone, PartialEq)]
pub enum Message<V, U> {
    /// Parent to child: please report your next best good
    Ask,
    /// Child to parent: a good whose values follow the reporting order the
    /// parent was told about earlier
    Util { values: Vec<V>, utility: U, confirmed: bool },
    /// Child to parent: a good along with the variable names (the separator
    /// grew) and the complete domain of each of these variables
    UtilVars { variables: Vec<String>, values: Vec<V>, utility: U, confirmed: bool, domains: Vec<Vec<V>> },
    /// Child to parent: a compact good along with domain size hints
    UtilDom { values: Vec<V>, utility: U, confirmed: bool, sizes: Vec<Option<usize>> },
    /// Child to parent: a good along with the variable names (the separator
    /// grew) and domain size hints
    UtilDomVars { variables: Vec<String>, values: Vec<V>, utility: U, confirmed: bool, sizes: Vec<Option<usize>> },
    /// Child to parent: there is nothing left to report
    Done,
    /// Parent to child: the last separator growth message arrived
    Ack,
    /// Parent to child: the values of the child's separator. A None context
    /// means the parent gave up on its subproblem (it is infeasible).
    ValueChild { context: Option<Context<V>>, confirmed: bool },
    /// Peer to pseudo-child: the current value of the sender
    ValuePseudo { value: V },
}

impl <V: Value, U: Utility> Message<V, U> {
    /// Wraps a good into the compact UTIL message
    pub fn util(good: Good<V, U>) -> Self {
        Message::Util { values: good.values, utility: good.utility, confirmed: good.confirmed }
    }
    /// Wraps a good into the UTIL message carrying variable names and domains
    pub fn util_vars(good: Good<V, U>, domains: Vec<Vec<V>>) -> Self {
        Message::UtilVars {
            variables: good.variables, values: good.values,
            utility: good.utility, confirmed: good.confirmed,
            domains
        }
    }
    /// Wraps a good into the compact UTIL message carrying domain sizes
    pub fn util_dom(good: Good<V, U>, sizes: Vec<Option<usize>>) -> Self {
        Message::UtilDom { values: good.values, utility: good.utility, confirmed: good.confirmed, sizes }
    }
    /// Wraps a good into the UTIL message carrying variable names and sizes
    pub fn util_dom_vars(good: Good<V, U>, sizes: Vec<Option<usize>>) -> Self {
        Message::UtilDomVars {
            variables: good.variables, values: good.values,
            utility: good.utility, confirmed: good.confirmed,
            sizes
        }
    }
    /// True for the messages of the UTIL family
    pub fn is_util(&self) -> bool {
        matches!(self,
            Message::Util { .. } | Message::UtilVars { .. } |
            Message::UtilDom { .. } | Message::UtilDomVars { .. })
    }
    /// True for the UTIL messages which announce a separator growth
    pub fn has_variables(&self) -> bool {
        matches!(self, Message::UtilVars { .. } | Message::UtilDomVars { .. })
    }
    /// A short name of the message kind (for logging purposes)
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Ask => "ASK",
            Message::Util { .. } => "UTIL",
            Message::UtilVars { .. } => "UTIL_VARS",
            Message::UtilDom { .. } => "UTIL_DOM",
            Message::UtilDomVars { .. } => "UTIL_DOM_VARS",
            Message::Done => "DONE",
            Message::Ack => "ACK",
            Message::ValueChild { .. } => "VALUE",
            Message::ValuePseudo { .. } => "VALUE_PSEUDO",
        }
    }
    /// Decodes a UTIL message into the information it carries. The compact
    /// forms are decoded with the reporting order given by `order`, which is
    /// only called when needed. Any other kind of message yields None.
    pub fn into_util<F>(self, order: F) -> Option<UtilContent<V, U>>
        where F: FnOnce() -> Vec<String>
    {
        match self {
            Message::Util { values, utility, confirmed } => {
                let good = Good::with_status(order(), values, utility, confirmed);
                Some(UtilContent { good, domains: None, sizes: None, announced: false })
            },
            Message::UtilVars { variables, values, utility, confirmed, domains } => {
                let domains = variables.iter().cloned().zip(domains.into_iter()).collect();
                let good = Good::with_status(variables, values, utility, confirmed);
                Some(UtilContent { good, domains: Some(domains), sizes: None, announced: true })
            },
            Message::UtilDom { values, utility, confirmed, sizes } => {
                let good = Good::with_status(order(), values, utility, confirmed);
                Some(UtilContent { good, domains: None, sizes: Some(sizes), announced: false })
            },
            Message::UtilDomVars { variables, values, utility, confirmed, sizes } => {
                let good = Good::with_status(variables, values, utility, confirmed);
                Some(UtilContent { good, domains: None, sizes: Some(sizes), announced: true })
            },
            _ => None
        }
    }
}

/// The information carried by a UTIL message once decoded
#[derive(Debug, Clone)]
pub struct UtilContent<V, U> {
    pub good: Good<V, U>,
    /// The complete domains of the good's variables (UTIL_VARS)
    pub domains: Option<Domains<V>>,
    /// The final domain size hints of the good's variables (UTIL_DOM*)
    pub sizes: Option<Vec<Option<usize>>>,
    /// True when the message announced the reporting order of the sender
    pub announced: bool,
}

/// A message along with its routing information
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<V, U> {
    pub sender: String,
    pub receiver: String,
    pub message: Message<V, U>,
}
impl <V, U> Envelope<V, U> {
    pub fn new(sender: &str, receiver: &str, message: Message<V, U>) -> Self {
        Envelope { sender: sender.to_string(), receiver: receiver.to_string(), message }
    }
}

/// The results the variables hand over to the statistics collector
#[derive(Debug, Clone, PartialEq)]
pub enum Report<V, U> {
    /// The optimal utility found by a root (or the infeasible sentinel)
    OptimalUtility { variable: String, utility: U },
    /// The size of the separator of a variable once its UTIL phase is over
    InducedWidth { variable: String, width: usize },
    /// The final value of a variable along with some counters
    Assignment(AssignmentReport<V>),
}

/// The final value chosen for a variable, along with the counters describing
/// the work its goods tree went through
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentReport<V> {
    pub variable: String,
    pub value: V,
    /// Percentage of the separator space materialized as leaves
    pub tree_fill: f64,
    /// Percentage of the leaves created below a dummy placeholder
    pub dummy_fill: f64,
    /// Number of separator variables whose domain was still incomplete
    pub dummies: usize,
    /// Number of goods sent to the parent
    pub goods_sent: usize,
    /// Size of the separator space (own variable included)
    pub space_size: f64,
    /// Number of speculative goods produced
    pub speculative_goods: usize,
    /// Number of confirmed goods produced
    pub confirmed_goods: usize,
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
