mod timelines;
