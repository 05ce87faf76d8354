// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP middleware: identity guard, ingress guard, security headers.

pub mod auth;
pub mod ingress_auth;
pub mod security;
