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

//! This module defines the boundary between the propagation protocols and
//! the outside world: the transport which carries messages between named
//! variables, the statistics collector which passively records results, and
//! the interface every per-variable protocol runtime exposes to its driver.

use std::collections::VecDeque;

use crate::{Envelope, Report, Utility, Value};

/// Point-to-point delivery between variables. The destination is given by
/// name in the envelope; resolving that name to an agent is the business of
/// the transport, never of the protocol.
pub trait Transport<V, U> {
    /// Hands a message over for delivery
    fn send(&mut self, envelope: Envelope<V, U>);
}

/// A passive sink for the results produced by the protocols. Nothing a
/// collector does may ever influence the control flow of a protocol.
pub trait StatsCollector<V, U> {
    /// Records one report
    fn report(&mut self, report: Report<V, U>);
}

/// The interface of a per-variable protocol runtime. A driver starts every
/// runtime once and then feeds it the messages addressed to its variable,
/// one at a time, each being processed to completion.
pub trait VariableProtocol<V: Value, U: Utility> {
    /// The variable this runtime is responsible for
    fn variable(&self) -> &str;
    /// Kicks off the protocol for this variable
    fn start(&mut self, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>);
    /// Processes one message addressed to this variable
    fn handle(&mut self, envelope: Envelope<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>);
    /// True once the variable has settled on its final value
    fn is_terminated(&self) -> bool;
}

/// A queue of envelopes is the simplest (FIFO) transport
impl <V, U> Transport<V, U> for VecDeque<Envelope<V, U>> {
    fn send(&mut self, envelope: Envelope<V, U>) {
        self.push_back(envelope)
    }
}
/// Collecting the envelopes in a vector comes in handy when testing a
/// single runtime in isolation
impl <V, U> Transport<V, U> for Vec<Envelope<V, U>> {
    fn send(&mut self, envelope: Envelope<V, U>) {
        self.push(envelope)
    }
}

/// A plain vector is the simplest statistics collector
impl <V, U> StatsCollector<V, U> for Vec<Report<V, U>> {
    fn report(&mut self, report: Report<V, U>) {
        self.push(report)
    }
}
